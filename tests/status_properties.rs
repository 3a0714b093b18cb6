// tests/status_properties.rs

use proptest::prelude::*;

use nfvbench::status::{is_ready, parse_account_list, parse_instance_list, parse_instance_status};

proptest! {
    #[test]
    fn parsers_never_panic_on_arbitrary_input(raw in ".{0,400}") {
        let tokens = parse_instance_status(&raw);
        let _ = is_ready(&tokens);
        let _ = parse_account_list(&raw, "pop");
        let _ = parse_instance_list(&raw);
    }

    #[test]
    fn account_listing_recovers_ports(ports in proptest::collection::vec(1u32..65535, 0..20)) {
        let mut raw = String::from("+------+\n| name | uuid |\n");
        for p in &ports {
            raw.push_str(&format!("| pop{p} | other{p}x |\n"));
        }
        prop_assert_eq!(parse_account_list(&raw, "pop"), ports);
    }

    #[test]
    fn readiness_needs_both_markers(running in any::<bool>(), configured in any::<bool>()) {
        let op = if running { "running" } else { "init" };
        let cfg = if configured { "configured" } else { "pending" };
        let raw = format!("| operational-status | {op} |\n| config-status | {cfg} |\n");
        prop_assert_eq!(is_ready(&parse_instance_status(&raw)), running && configured);
    }
}
