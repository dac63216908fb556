// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of Understory Index: insert, build, and walk a query cursor quad by quad.

use understory_index::{Aabb2D, Index, Query};

fn main() {
    let mut idx = Index::<i64, u32>::with_rtree();
    for i in 0..32_i64 {
        let aabb = Aabb2D::<i64>::from_xywh(i * 10, (i % 4) * 10, 8, 8);
        let _ = idx.insert(aabb, u32::try_from(i).unwrap());
    }
    idx.ensure_built();

    let mut cursor = idx.query(Query::Touching(Aabb2D::new(0, 0, 120, 15)));
    while let Some((key, aabb, payload)) = cursor.current() {
        println!(
            "quad {:?} box {:?}: {:?} -> {} at {:?}",
            cursor.quad_id(),
            cursor.quad_box(),
            key,
            payload,
            aabb
        );
        cursor.advance();
    }
}
