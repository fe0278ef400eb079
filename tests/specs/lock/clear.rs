//! Lock clear specs

use crate::prelude::*;

#[test]
fn clearing_a_free_lock_reports_not_held() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["clear", "orders"])
        .passes()
        .stdout_eq("orders: not held\n");
}
