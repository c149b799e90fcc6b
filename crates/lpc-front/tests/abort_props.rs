use lpc_front::protocol::{LAD_IDLE, START_FW_READ, START_FW_WRITE, START_TARGET};
use lpc_front::{LpcFront, LpcPins, LpcState, ReadResponse};
use proptest::prelude::*;

fn pins() -> impl Strategy<Value = LpcPins> {
    (0u8..16, prop::bool::weighted(0.1), prop::bool::weighted(0.02)).prop_map(
        |(lad, lframe, lreset)| LpcPins {
            lad,
            lframe,
            lreset,
        },
    )
}

fn response() -> impl Strategy<Value = Option<ReadResponse>> {
    prop_oneof![
        3 => Just(None),
        1 => (any::<u32>(), any::<bool>()).prop_map(|(data, error)| Some(ReadResponse { data, error })),
    ]
}

proptest! {
    #[test]
    fn abort_symbol_always_returns_to_start(
        prefix in proptest::collection::vec((pins(), response()), 0..64),
    ) {
        let mut front = LpcFront::new();
        for (pins, rsp) in prefix {
            front.clock(pins, rsp);
        }
        let cycle = front.clock(LpcPins::frame(LAD_IDLE), None);
        prop_assert!(!cycle.drive.enabled);
        prop_assert!(cycle.reset_queues);
        prop_assert!(cycle.command.is_none());
        prop_assert_eq!(front.state(), LpcState::Start);
    }

    #[test]
    fn start_nibble_selects_cycle_family(
        prefix in proptest::collection::vec((pins(), response()), 0..32),
        start in prop_oneof![Just(START_TARGET), Just(START_FW_READ), Just(START_FW_WRITE)],
    ) {
        let mut front = LpcFront::new();
        for (pins, rsp) in prefix {
            front.clock(pins, rsp);
        }
        front.clock(LpcPins::frame(start), None);
        let expected = if start == START_TARGET { LpcState::CycleType } else { LpcState::FwIdSel };
        prop_assert_eq!(front.state(), expected);
    }

    #[test]
    fn reset_never_drives_lad(
        prefix in proptest::collection::vec((pins(), response()), 0..64),
        lad in 0u8..16,
    ) {
        let mut front = LpcFront::new();
        for (pins, rsp) in prefix {
            front.clock(pins, rsp);
        }
        let cycle = front.clock(LpcPins { lad, lframe: false, lreset: true }, Some(ReadResponse::ok(0)));
        prop_assert!(!cycle.drive.enabled);
        prop_assert_eq!(front.state(), LpcState::Start);
    }
}
