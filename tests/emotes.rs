//! Emote verbs from the world vocabulary, conjugated per viewpoint.

mod common;

use undercroft::game::start_game_server;

use common::{drain, event_texts, keep_world, login, sole_error};

#[tokio::test]
async fn emotes_conjugate_for_actor_and_bystanders() {
    let handle = start_game_server(keep_world(), None, None);
    let (_ann_rx, _) = login(&handle, "char_ann").await;
    let (mut bob_rx, _) = login(&handle, "char_bob").await;
    let (mut boris_rx, _) = login(&handle, "char_boris").await;
    drain(&mut bob_rx);
    drain(&mut boris_rx);

    let replies = handle.command("char_ann", "/dance").await.unwrap();
    assert_eq!(event_texts(&replies), vec!["You have danced.".to_string()]);
    assert_eq!(
        event_texts(&drain(&mut bob_rx)),
        vec!["Ann the Swift has danced.".to_string()]
    );

    // Verbs ending in e take a bare d.
    let replies = handle.command("char_ann", "/sneeze").await.unwrap();
    assert_eq!(event_texts(&replies), vec!["You have sneezed.".to_string()]);
    assert_eq!(
        event_texts(&drain(&mut bob_rx)),
        vec!["Ann the Swift has sneezed.".to_string()]
    );

    // Boris is one room over and sees none of it.
    assert!(drain(&mut boris_rx).is_empty());
}

#[tokio::test]
async fn emotes_outside_the_vocabulary_are_unknown_commands() {
    let handle = start_game_server(keep_world(), None, None);
    let (_ann_rx, _) = login(&handle, "char_ann").await;

    let replies = handle.command("char_ann", "/cartwheel").await.unwrap();
    assert_eq!(sole_error(&replies), "Unknown command: /cartwheel");
}

#[tokio::test]
async fn trailing_words_after_an_emote_are_ignored() {
    let handle = start_game_server(keep_world(), None, None);
    let (_ann_rx, _) = login(&handle, "char_ann").await;

    let replies = handle.command("char_ann", "/dance wildly").await.unwrap();
    assert_eq!(event_texts(&replies), vec!["You have danced.".to_string()]);
}
