// ==========================================
// 核对流程集成测试
// ==========================================
// 测试目标: 订单解析 → 扫码/手工录入 → 差异报表 → 删除订单
// ==========================================


use chrono::NaiveDate;
use stock_checker::domain::types::ReportMode;
use stock_checker::engine::{
    EngineError, ForceAddDecision, OrderResolution, RejectReason, ScanOutcome, ScanRequest,
};
use stock_checker::ProductCode;
use test_helpers::{create_test_state, insert_test_order};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
}

fn code(raw: &str) -> ProductCode {
    ProductCode::parse(raw).unwrap()
}

#[test]
fn test_scan_sequence_with_negative_correction() {
    let (_tmp, state) = create_test_state().unwrap();
    insert_test_order(&state, 40408133, "SJ532017", &[("AB1234", 3, 0)]).unwrap();
    state.catalog.add_product("5012345678900", "ab1234", today()).unwrap();

    let order_number = state.resolver.resolve_order_number("sj532017").unwrap();
    assert_eq!(order_number, 40408133);

    for _ in 0..2 {
        let outcome = state
            .reconciliation
            .apply_scan_event(&ScanRequest::new(order_number, "5012345678900"))
            .unwrap();
        assert!(matches!(outcome, ScanOutcome::LineUpdated { delta: 1, .. }));
    }

    // 手工编码必须给数量
    let outcome = state
        .reconciliation
        .apply_scan_event(&ScanRequest::new(order_number, "ab1234"))
        .unwrap();
    assert!(matches!(
        outcome,
        ScanOutcome::QuantityRequired { on_order: true, .. }
    ));

    let outcome = state
        .reconciliation
        .apply_scan_event(&ScanRequest::new(order_number, "ab1234").with_quantity(-1))
        .unwrap();
    let ScanOutcome::LineUpdated { line, delta, .. } = outcome else {
        panic!("应为 LineUpdated");
    };
    assert_eq!(delta, -1);
    assert_eq!(line.scanned_quantity, 1);
    assert_eq!(line.discrepancy(), -2);

    let report = state
        .reports
        .render_order(order_number, ReportMode::Full)
        .unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].discrepancy, -2);
    assert_eq!(report.summary.missing_units, 2);
}

#[test]
fn test_force_add_confirm_and_decline() {
    let (_tmp, state) = create_test_state().unwrap();
    insert_test_order(&state, 1001, "SJ1", &[("AB1234", 1, 1)]).unwrap();

    let request = ScanRequest::new(1001, "zz9999").with_quantity(5);
    let outcome = state.reconciliation.apply_scan_event(&request).unwrap();
    assert!(matches!(outcome, ScanOutcome::ConfirmationRequired { .. }));

    let declined = state
        .reconciliation
        .apply_scan_event(&request.clone().with_force_add(ForceAddDecision::Decline))
        .unwrap();
    assert_eq!(
        declined,
        ScanOutcome::Rejected {
            reason: RejectReason::Declined
        }
    );
    assert_eq!(state.orders.list_lines(1001).unwrap().len(), 1);

    let created = state
        .reconciliation
        .apply_scan_event(&request.with_force_add(ForceAddDecision::Confirm))
        .unwrap();
    let ScanOutcome::LineCreated { line, .. } = created else {
        panic!("应为 LineCreated");
    };
    assert_eq!(line.product_code, code("ZZ9999"));
    assert_eq!(line.expected_quantity, 0);
    assert_eq!(line.scanned_quantity, 5);

    let verify = state
        .reports
        .render_order(1001, ReportMode::DiscrepanciesOnly)
        .unwrap();
    assert_eq!(verify.rows.len(), 1);
    assert_eq!(verify.rows[0].discrepancy, 5);
    assert_eq!(verify.summary.excess_units, 5);
}

#[test]
fn test_invalid_input_rejected_without_mutation() {
    let (_tmp, state) = create_test_state().unwrap();
    insert_test_order(&state, 1001, "SJ1", &[("AB1234", 1, 0)]).unwrap();

    let outcome = state
        .reconciliation
        .apply_scan_event(&ScanRequest::new(1001, "A12345").with_quantity(1))
        .unwrap();
    assert_eq!(
        outcome,
        ScanOutcome::Rejected {
            reason: RejectReason::InvalidInput
        }
    );
    assert_eq!(state.orders.list_lines(1001).unwrap()[0].scanned_quantity, 0);
}

#[test]
fn test_resolver_reference_rules() {
    let (_tmp, state) = create_test_state().unwrap();
    insert_test_order(&state, 1, "SJ1", &[]).unwrap();
    insert_test_order(&state, 2, "SJ2", &[]).unwrap();
    insert_test_order(&state, 3, "SJ2", &[]).unwrap();

    assert!(matches!(
        state.resolver.resolve("SJ1").unwrap(),
        OrderResolution::Resolved { order_number: 1, .. }
    ));
    assert!(matches!(
        state.resolver.resolve("2").unwrap(),
        OrderResolution::Resolved { order_number: 2, .. }
    ));
    assert!(matches!(
        state.resolver.resolve("sj2").unwrap_err(),
        EngineError::AmbiguousReference { count: 2, .. }
    ));
    assert_eq!(state.resolver.resolve("BACK").unwrap(), OrderResolution::Cancelled);
    assert!(matches!(
        state.resolver.resolve("99").unwrap_err(),
        EngineError::NotFound { .. }
    ));
}

#[test]
fn test_remove_order_leaves_other_orders() {
    let (_tmp, state) = create_test_state().unwrap();
    insert_test_order(&state, 1, "SJ1", &[("AB1234", 2, 1), ("CD5678", 1, 0)]).unwrap();
    insert_test_order(&state, 2, "SJ2", &[("AB1234", 4, 4)]).unwrap();

    assert_eq!(state.orders.remove_order(1).unwrap(), 2);
    assert!(state.orders.list_lines(1).unwrap().is_empty());
    assert_eq!(state.orders.list_lines(2).unwrap().len(), 1);
    assert_eq!(state.orders.list_orders().unwrap().len(), 1);
}

#[test]
fn test_adjust_expected_quantity_sets_value() {
    let (_tmp, state) = create_test_state().unwrap();
    insert_test_order(&state, 1, "SJ1", &[("AB1234", 2, 1)]).unwrap();

    state
        .reconciliation
        .adjust_expected_quantity(1, "ab1234", 7, ForceAddDecision::Ask)
        .unwrap();
    let lines = state.orders.list_lines(1).unwrap();
    assert_eq!(lines[0].expected_quantity, 7);
    assert_eq!(lines[0].scanned_quantity, 1);

    let err = state
        .reconciliation
        .adjust_expected_quantity(99, "AB1234", 1, ForceAddDecision::Confirm)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn test_extreme_expected_quantity_still_reportable() {
    let (_tmp, state) = create_test_state().unwrap();
    insert_test_order(&state, 1, "SJ1", &[("AB1234", 2, 1)]).unwrap();

    state
        .reconciliation
        .adjust_expected_quantity(1, "AB1234", i64::MIN, ForceAddDecision::Ask)
        .unwrap();

    for mode in [ReportMode::Full, ReportMode::DiscrepanciesOnly] {
        let report = state.reports.render_order(1, mode).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].expected_quantity, i64::MIN);
        assert_eq!(report.rows[0].discrepancy, 1 - i128::from(i64::MIN));
        assert_eq!(report.summary.excess_units, 1 - i128::from(i64::MIN));
    }
}

#[test]
fn test_scan_past_quantity_range_is_rejected() {
    let (_tmp, state) = create_test_state().unwrap();
    insert_test_order(&state, 1, "SJ1", &[("AB1234", 2, i64::MAX)]).unwrap();

    let outcome = state
        .reconciliation
        .apply_scan_event(&ScanRequest::new(1, "AB1234").with_quantity(1))
        .unwrap();
    assert_eq!(
        outcome,
        ScanOutcome::Rejected {
            reason: RejectReason::QuantityOutOfRange
        }
    );

    let lines = state.orders.list_lines(1).unwrap();
    assert_eq!(lines[0].scanned_quantity, i64::MAX);
    assert_eq!(lines[0].expected_quantity, 2);
}
