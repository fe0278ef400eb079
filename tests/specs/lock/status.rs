//! Lock status specs

use crate::prelude::*;

#[test]
fn unheld_lock_is_free() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["status", "orders"])
        .passes()
        .stdout_eq("orders: free\n");
}

#[test]
fn json_status() {
    let temp = Project::empty();
    let run = temp.kvl().args(&["status", "orders", "--json"]).passes();

    let value: serde_json::Value = serde_json::from_str(&run.stdout()).unwrap();
    assert_eq!(value["name"], "orders");
    assert_eq!(value["held"], false);
    assert!(value["token"].is_null());
}

#[test]
fn store_url_from_config_file() {
    let temp = Project::empty();
    temp.file("kvl.toml", FAST_SETTINGS);
    temp.kvl_bare()
        .args(&["--config", "kvl.toml", "status", "orders"])
        .passes()
        .stdout_eq("orders: free\n");
}
