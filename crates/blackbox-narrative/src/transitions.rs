use std::time::Duration;

use serde::Serialize;

const CUE_DURATION: Duration = Duration::from_millis(2500);

/// Interstitial shown between two acts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionCue {
    pub text: &'static str,
    pub subtitle: &'static str,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Cue for moving forward from `from_act` to `to_act`, if one exists.
///
/// Only single-step forward moves into acts 2 to 4 have cues.
#[must_use]
pub fn transition_cue(from_act: u32, to_act: u32) -> Option<TransitionCue> {
    if to_act != from_act.checked_add(1)? {
        return None;
    }
    let (text, subtitle) = match to_act {
        2 => (
            "⏳ The ice water of reality is about to pour down...",
            "Act Two: Reality Breaks Through",
        ),
        3 => (
            "🔨 Smashing the old map is how a new continent gets drawn...",
            "Act Three: Cognitive Reconstruction",
        ),
        4 => (
            "⚡ The theory is complete. Time to forge your weapon...",
            "Act Four: Armed with Wisdom",
        ),
        _ => return None,
    };
    Some(TransitionCue {
        text,
        subtitle,
        duration: CUE_DURATION,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_steps_have_cues() {
        for (from, subtitle) in [
            (1, "Act Two: Reality Breaks Through"),
            (2, "Act Three: Cognitive Reconstruction"),
            (3, "Act Four: Armed with Wisdom"),
        ] {
            let cue = transition_cue(from, from + 1).unwrap();
            assert_eq!(cue.subtitle, subtitle);
            assert_eq!(cue.duration, Duration::from_millis(2500));
        }
    }

    #[test]
    fn test_no_cue_for_other_moves() {
        assert!(transition_cue(2, 1).is_none());
        assert!(transition_cue(1, 3).is_none());
        assert!(transition_cue(4, 5).is_none());
        assert!(transition_cue(u32::MAX, 0).is_none());
    }

    #[test]
    fn test_serializes_duration_in_millis() {
        let json = serde_json::to_value(transition_cue(1, 2).unwrap()).unwrap();
        assert_eq!(json["duration_ms"], 2500);
    }
}
