//! Browser-side tests for the JS facade.

#![cfg(target_arch = "wasm32")]

use js_sys::Function;
use orgchart_wasm::{DepartmentRecord, OrgChartWasm};
use wasm_bindgen::{JsError, JsValue};
use wasm_bindgen_test::*;

fn ok<T>(result: Result<T, JsError>) -> T {
    match result {
        Ok(value) => value,
        Err(_) => panic!("facade call failed"),
    }
}

fn records() -> JsValue {
    let records = vec![
        DepartmentRecord::new("A", "Company", "CO"),
        DepartmentRecord::new("B", "Engineering", "ENG").with_parent("A"),
        DepartmentRecord::new("C", "Sales", "SAL").with_parent("A"),
    ];
    serde_wasm_bindgen::to_value(&records).unwrap()
}

fn loaded() -> OrgChartWasm {
    let mut chart = ok(OrgChartWasm::new(JsValue::UNDEFINED));
    ok(chart.set_data(records()));
    let mut now = 0.0;
    while chart.tick(now) {
        now += 16.0;
    }
    chart
}

#[wasm_bindgen_test]
fn test_data_and_frame() {
    let chart = loaded();
    assert_eq!(chart.node_ids(), vec!["A", "B", "C"]);
    assert_eq!(chart.node_positions().length(), 6);
    assert!(ok(chart.frame()).is_object());
}

#[wasm_bindgen_test]
fn test_view_mode_names() {
    let mut chart = loaded();
    assert!(!ok(chart.set_view_mode("hierarchy")));
    assert!(ok(chart.set_view_mode("radial")));
    assert_eq!(chart.view_mode(), "radial");
    assert!(chart.set_view_mode("sunburst").is_err());
}

#[wasm_bindgen_test]
fn test_drop_rejection_is_null() {
    let mut chart = loaded();
    assert!(chart.begin_drag("A"));
    assert!(ok(chart.drop_on("B")).is_null());

    assert!(chart.begin_drag("B"));
    assert!(chart.drag_over(Some("C".to_string())));
    assert!(ok(chart.drop_on("C")).is_object());
}

#[wasm_bindgen_test]
fn test_export_calls_back() {
    let chart = loaded();
    let ok = Function::new_with_args("snapshot, format", "if (format !== 'png') throw 'bad format';");
    assert!(chart.export("png", &ok).is_ok());

    let failing = Function::new_with_args("snapshot, format", "throw 'printer offline';");
    assert!(chart.export("print", &failing).is_err());
    assert!(chart.export("bmp", &ok).is_err());
}

#[wasm_bindgen_test]
fn test_config_json() {
    assert!(OrgChartWasm::from_config_json(r#"{"extent": {"width": 400}}"#).is_ok());
    assert!(OrgChartWasm::from_config_json("{").is_err());
}
