//! Property tests for the pure engine components.

use licprobe_core::decoder::decode_product_key;
use licprobe_core::sensitivity::mask_key;
use licprobe_core::status::{normalize, LicenseState};
use proptest::prelude::*;

const KEY_ALPHABET: &str = "BCDFGHJKMPQRTVWXY2346789";

proptest! {
    #[test]
    fn decoder_output_is_always_key_shaped(blob in proptest::collection::vec(any::<u8>(), 67..256)) {
        let key = decode_product_key(&blob).expect("blob is long enough");
        prop_assert_eq!(key.len(), 29);
        let groups: Vec<&str> = key.split('-').collect();
        prop_assert_eq!(groups.len(), 5);
        for group in groups {
            prop_assert_eq!(group.len(), 5);
            prop_assert!(group.chars().all(|c| KEY_ALPHABET.contains(c)));
        }
    }

    #[test]
    fn decoder_is_deterministic(blob in proptest::collection::vec(any::<u8>(), 67..128)) {
        prop_assert_eq!(decode_product_key(&blob), decode_product_key(&blob));
    }

    #[test]
    fn short_blobs_never_decode(blob in proptest::collection::vec(any::<u8>(), 0..67)) {
        prop_assert_eq!(decode_product_key(&blob), None);
    }

    #[test]
    fn normalizer_is_total_and_code_preserving(raw in any::<i32>(), reason in any::<i32>()) {
        let state = normalize(raw, reason);
        match (raw, reason) {
            (2, 0x4004_F00D) => prop_assert_eq!(state.code(), 3),
            (2, 0x4004_F065) => prop_assert_eq!(state.code(), 4),
            (2, 0x4004_FC06) => prop_assert_eq!(state.code(), 6),
            (3, _) => prop_assert_eq!(state.code(), 5),
            _ => prop_assert_eq!(state.code(), raw),
        }
        // Out-of-range codes survive numerically.
        if !(0..=6).contains(&raw) && raw != 3 {
            prop_assert_eq!(state, LicenseState::Unknown(raw));
        }
    }

    #[test]
    fn five_group_masks_keep_outer_groups(
        first in "[A-Z0-9]{5}",
        middle in proptest::collection::vec("[A-Z0-9]{5}", 3),
        last in "[A-Z0-9]{5}",
    ) {
        let key = format!("{first}-{}-{last}", middle.join("-"));
        let masked = mask_key(&key);
        prop_assert_eq!(masked, format!("{first}-*****-*****-*****-{last}"));
    }

    #[test]
    fn non_five_group_strings_mask_to_themselves(s in "[A-Z0-9-]{0,40}") {
        prop_assume!(s.split('-').count() != 5);
        prop_assert_eq!(mask_key(&s), s);
    }

    #[test]
    fn reason_never_changes_terminal_states(raw in prop_oneof![Just(0i32), Just(1i32)], reason in any::<i32>()) {
        prop_assert_eq!(normalize(raw, reason).code(), raw);
    }
}
