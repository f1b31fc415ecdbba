//! Property-based invariants for graph merging and breakpoint arbitration.

use jac_playground::debugger::{Breakpoints, DebugContext, RunMode};
use jac_playground::graph::GraphSnapshot;
use jac_playground::protocol::ControlCommand;
use proptest::prelude::*;

fn snapshot_strategy() -> impl Strategy<Value = GraphSnapshot> {
    (
        prop::collection::vec((0u8..6, 0u8..3), 0..12),
        prop::collection::vec((0u8..6, 0u8..6), 0..12),
    )
        .prop_map(|(nodes, edges)| {
            let mut snapshot = GraphSnapshot::new();
            for (id, label) in nodes {
                snapshot.add_node(format!("n{}", id), format!("label {}", label));
            }
            for (from, to) in edges {
                snapshot.add_edge(format!("n{}", from), format!("n{}", to));
            }
            snapshot
        })
}

fn mode_strategy() -> impl Strategy<Value = RunMode> {
    prop_oneof![
        Just(RunMode::Continue),
        Just(RunMode::StepOver),
        Just(RunMode::StepInto),
        Just(RunMode::StepOut),
    ]
}

proptest! {
    #[test]
    fn merge_is_idempotent(base in snapshot_strategy(), incoming in snapshot_strategy()) {
        let mut once = base.clone();
        once.merge(&incoming);
        let mut twice = once.clone();
        prop_assert_eq!(twice.merge(&incoming), 0);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn merge_only_appends(base in snapshot_strategy(), incoming in snapshot_strategy()) {
        let mut merged = base.clone();
        let added = merged.merge(&incoming);

        prop_assert_eq!(&merged.nodes[..base.nodes.len()], &base.nodes[..]);
        prop_assert_eq!(&merged.edges[..base.edges.len()], &base.edges[..]);
        prop_assert_eq!(
            merged.nodes.len() + merged.edges.len(),
            base.nodes.len() + base.edges.len() + added
        );
        for node in &incoming.nodes {
            prop_assert!(merged.contains_node(node));
        }
        for edge in &incoming.edges {
            prop_assert!(merged.contains_edge(edge));
        }
    }

    #[test]
    fn breakpoint_set_is_unique_and_ascending(lines in prop::collection::vec(0u32..50, 0..30)) {
        let bps = Breakpoints::from_lines(&lines);
        let listed = bps.lines();
        prop_assert!(listed.windows(2).all(|w| w[0] < w[1]));
        for line in 1u32..50 {
            prop_assert_eq!(bps.contains(line), lines.contains(&line));
        }
        prop_assert!(!bps.contains(0));
    }

    #[test]
    fn only_breakpoints_stop_a_continued_run(
        lines in prop::collection::vec(1u32..40, 0..10),
        probe in 1u32..40,
        depth in 0usize..5,
    ) {
        let ctx = DebugContext::new(Breakpoints::from_lines(&lines));
        prop_assert_eq!(ctx.should_stop_at(probe, depth), lines.contains(&probe));
    }

    #[test]
    fn breakpoints_win_over_any_step_mode(
        mode in mode_strategy(),
        line in 1u32..40,
        stop_depth in 0usize..5,
        depth in 0usize..5,
    ) {
        let mut ctx = DebugContext::new(Breakpoints::from_lines(&[line]));
        ctx.resume(mode.command(), stop_depth);
        prop_assert!(ctx.should_stop_at(line, depth));
    }

    #[test]
    fn clear_then_set_rebuilds_exactly(
        before in prop::collection::vec(1u32..40, 0..10),
        after in prop::collection::vec(1u32..40, 0..10),
    ) {
        let mut ctx = DebugContext::new(Breakpoints::from_lines(&before));
        ctx.apply_breakpoint_command(ControlCommand::ClearBreakpoints);
        for line in &after {
            ctx.apply_breakpoint_command(ControlCommand::SetBreakpoint(*line));
        }
        prop_assert_eq!(ctx.breakpoints(), &Breakpoints::from_lines(&after));
    }
}
