//! Narration formats for directed speech, movement and emotes.
//!
//! Kept as plain functions so the exact player-visible wording lives in one
//! place and the engine stays free of string literals.

/// Broadcast to the room a character just moved into.
pub fn entered(name: &str) -> String {
    format!("{} has entered.", name)
}

/// Broadcast to the room a character just vacated.
pub fn left(name: &str) -> String {
    format!("{} has left.", name)
}

pub fn tell_to_recipient(sender: &str, text: &str) -> String {
    format!("{} tells you: '{}'", sender, text)
}

pub fn tell_confirmation(target: &str, text: &str) -> String {
    format!("You tell {}: '{}'", target, text)
}

pub fn tell_all_to_recipient(sender: &str, text: &str) -> String {
    format!("{} tells everyone: '{}'", sender, text)
}

pub fn tell_all_confirmation(text: &str) -> String {
    format!("You tell everyone: '{}'", text)
}

/// Yells carry the same structure as tells with the phrase and the text
/// upper-cased; the sender's display name stays as written.
pub fn yell_to_recipient(sender: &str, text: &str) -> String {
    format!("{} YELLS AT YOU: '{}'", sender, text.to_uppercase())
}

pub fn yell_confirmation(target: &str, text: &str) -> String {
    format!("You yell at {}: '{}'", target, text.to_uppercase())
}

pub fn yell_all_to_recipient(sender: &str, text: &str) -> String {
    format!("{} YELLS AT EVERYONE: '{}'", sender, text.to_uppercase())
}

pub fn yell_all_confirmation(text: &str) -> String {
    format!("You yell at everyone: '{}'", text.to_uppercase())
}

pub fn emote_actor(verb: &str) -> String {
    format!("You have {}.", past_tense(verb))
}

pub fn emote_bystander(name: &str, verb: &str) -> String {
    format!("{} has {}.", name, past_tense(verb))
}

/// Regular past tense only: a trailing `e` takes `d`, everything else `ed`.
pub fn past_tense(verb: &str) -> String {
    if verb.ends_with('e') {
        format!("{}d", verb)
    } else {
        format!("{}ed", verb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_broadcasts_name_the_mover() {
        assert_eq!(entered("Bob the Brave"), "Bob the Brave has entered.");
        assert_eq!(left("Bob the Brave"), "Bob the Brave has left.");
    }

    #[test]
    fn tell_formats() {
        assert_eq!(
            tell_to_recipient("Bob the Brave", "hello"),
            "Bob the Brave tells you: 'hello'"
        );
        assert_eq!(
            tell_confirmation("Boris the Bold", "hello"),
            "You tell Boris the Bold: 'hello'"
        );
        assert_eq!(
            tell_all_to_recipient("Bob the Brave", "gather up"),
            "Bob the Brave tells everyone: 'gather up'"
        );
        assert_eq!(tell_all_confirmation("gather up"), "You tell everyone: 'gather up'");
    }

    #[test]
    fn yells_uppercase_text_but_not_names() {
        assert_eq!(
            yell_to_recipient("Lina the Quiet", "watch out"),
            "Lina the Quiet YELLS AT YOU: 'WATCH OUT'"
        );
        assert_eq!(
            yell_confirmation("Lina the Quiet", "watch out"),
            "You yell at Lina the Quiet: 'WATCH OUT'"
        );
        assert_eq!(
            yell_all_to_recipient("Ann", "hi"),
            "Ann YELLS AT EVERYONE: 'HI'"
        );
        assert_eq!(yell_all_confirmation("hi"), "You yell at everyone: 'HI'");
    }

    #[test]
    fn emote_tense_handles_trailing_e() {
        assert_eq!(emote_actor("sneeze"), "You have sneezed.");
        assert_eq!(emote_actor("laugh"), "You have laughed.");
        assert_eq!(
            emote_bystander("Bob the Brave", "dance"),
            "Bob the Brave has danced."
        );
        assert_eq!(
            emote_bystander("Boris the Bold", "yawn"),
            "Boris the Bold has yawned."
        );
    }
}
