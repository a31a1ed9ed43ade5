use super::*;
use crate::prompt::ScriptedPrompter;
use std::cell::Cell;
use std::net::Ipv4Addr;

/// Inspector returning a fixed address and counting how often it is asked.
struct StubInspector {
    address: Option<(Ipv4Addr, u8)>,
    calls: Cell<usize>,
}

impl StubInspector {
    fn detecting(address: Ipv4Addr, prefix: u8) -> Self {
        Self {
            address: Some((address, prefix)),
            calls: Cell::new(0),
        }
    }

    fn offline() -> Self {
        Self {
            address: None,
            calls: Cell::new(0),
        }
    }
}

impl NetworkInspector for StubInspector {
    fn default_route_interface(&self) -> Option<String> {
        self.calls.set(self.calls.get() + 1);
        self.address.map(|_| "eth0".to_string())
    }

    fn interface_ipv4(&self, _interface: &str) -> Option<(Ipv4Addr, u8)> {
        self.address
    }
}

fn spec(literal: &str) -> SubnetSpec {
    SubnetSpec::parse(literal).expect("valid literal")
}

#[test]
fn explicit_lan_subnet_is_returned_without_detection_or_prompts() {
    let resolver = SubnetResolver::new(StubInspector::detecting(Ipv4Addr::new(10, 0, 0, 5), 8));
    let mut prompter = ScriptedPrompter::default();

    let resolution = resolver
        .resolve(Some("192.168.1.0/24"), true, &mut prompter)
        .expect("resolve");

    assert_eq!(resolution, Resolution::Accepted(spec("192.168.1.0/24")));
    assert_eq!(resolver.inspector.calls.get(), 0);
    assert!(prompter.asked.is_empty());
}

#[test]
fn explicit_broad_subnet_requires_confirmation() {
    let resolver = SubnetResolver::new(StubInspector::offline());

    let mut yes = ScriptedPrompter::new(["y"]);
    let accepted = resolver
        .resolve(Some("10.0.0.0/8"), true, &mut yes)
        .expect("resolve");
    assert_eq!(accepted, Resolution::Accepted(spec("10.0.0.0/8")));
    assert_eq!(yes.asked.len(), 1);
    assert!(yes.notices[0].starts_with("WARNING: 10.0.0.0/8 covers 16777216 addresses"));

    let mut no = ScriptedPrompter::new(["n"]);
    let declined = resolver
        .resolve(Some("10.0.0.0/8"), true, &mut no)
        .expect("resolve");
    assert_eq!(declined, Resolution::Declined);
}

#[test]
fn broad_confirmation_defaults_to_decline() {
    let resolver = SubnetResolver::new(StubInspector::offline());
    let mut prompter = ScriptedPrompter::new([""]);
    let resolution = resolver
        .resolve(Some("172.16.0.0/12"), true, &mut prompter)
        .expect("resolve");
    assert_eq!(resolution, Resolution::Declined);
}

#[test]
fn invalid_explicit_values_are_validation_errors() {
    let resolver = SubnetResolver::new(StubInspector::offline());
    for literal in ["999.1.1.1/24", "192.168.1.0/33", "lan"] {
        let mut prompter = ScriptedPrompter::default();
        let err = resolver
            .resolve(Some(literal), true, &mut prompter)
            .unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ProvisionError>(),
                Some(ProvisionError::Validation(_))
            ),
            "{literal}: {err}"
        );
        assert!(prompter.asked.is_empty());
    }
}

#[test]
fn non_interactive_accepts_detected_subnet() {
    let resolver =
        SubnetResolver::new(StubInspector::detecting(Ipv4Addr::new(192, 168, 7, 42), 24));
    let mut prompter = ScriptedPrompter::default();
    let resolution = resolver.resolve(None, false, &mut prompter).expect("resolve");
    assert_eq!(resolution, Resolution::Accepted(spec("192.168.7.0/24")));
    assert!(prompter.asked.is_empty());
}

#[test]
fn non_interactive_fails_closed_on_broad_or_missing_detection() {
    let broad = SubnetResolver::new(StubInspector::detecting(Ipv4Addr::new(10, 1, 2, 3), 8));
    let mut prompter = ScriptedPrompter::default();
    assert_eq!(
        broad.resolve(None, false, &mut prompter).expect("resolve"),
        Resolution::Declined
    );

    let offline = SubnetResolver::new(StubInspector::offline());
    let err = offline.resolve(None, false, &mut prompter).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::DetectionFailed)
    ));
}

#[test]
fn interactive_operator_can_override_detected_value() {
    let resolver =
        SubnetResolver::new(StubInspector::detecting(Ipv4Addr::new(192, 168, 7, 42), 24));
    let mut prompter = ScriptedPrompter::new(["n", "192.168.50.0/24"]);
    let resolution = resolver.resolve(None, true, &mut prompter).expect("resolve");
    assert_eq!(resolution, Resolution::Accepted(spec("192.168.50.0/24")));
    assert_eq!(prompter.asked[0], "Detected local subnet 192.168.7.0/24. Use it?");
}

#[test]
fn manual_entry_retries_until_valid() {
    let resolver = SubnetResolver::new(StubInspector::offline());
    let mut prompter =
        ScriptedPrompter::new(["", "300.1.1.0/24", "192.168.1.0/40", "192.168.9.0/24"]);
    let resolution = resolver.resolve(None, true, &mut prompter).expect("resolve");

    assert_eq!(resolution, Resolution::Accepted(spec("192.168.9.0/24")));
    assert_eq!(prompter.asked.len(), 4);
    assert_eq!(prompter.notices.len(), 3);
    assert!(prompter.notices[1].contains("greater than 255"));
    assert!(prompter.notices[2].contains("greater than 32"));
}

#[test]
fn closed_input_surfaces_as_error() {
    let resolver = SubnetResolver::new(StubInspector::offline());
    let mut prompter = ScriptedPrompter::new(["bogus"]);
    assert!(resolver.resolve(None, true, &mut prompter).is_err());
}

#[test]
fn machine_walks_needs_input_to_accepted() {
    let mut machine = ResolveMachine::start(None, true, || None).expect("start");
    assert_eq!(
        machine.state(),
        &ResolveState::NeedsInput(Prompt::EnterManual { retry: None })
    );

    let state = machine.feed(Input::Text("10.0.0.0/8".to_string())).clone();
    assert_eq!(state, ResolveState::NeedsInput(Prompt::ConfirmBroad(spec("10.0.0.0/8"))));

    machine.feed(Input::Yes);
    assert_eq!(machine.resolution(), Some(Resolution::Accepted(spec("10.0.0.0/8"))));

    // Terminal states ignore further input.
    machine.feed(Input::No);
    assert_eq!(machine.resolution(), Some(Resolution::Accepted(spec("10.0.0.0/8"))));
}

#[test]
fn declining_broad_range_is_final() {
    let mut machine = ResolveMachine::start(Some("10.0.0.0/16"), true, || None).expect("start");
    machine.feed(Input::No);
    assert_eq!(machine.state(), &ResolveState::Declined);
    machine.feed(Input::Text("192.168.1.0/24".to_string()));
    assert_eq!(machine.state(), &ResolveState::Declined);
}
