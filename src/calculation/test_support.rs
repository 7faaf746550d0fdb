//! Shared builders for calculation unit tests.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::config::ReferenceSnapshot;
use crate::models::{
    AllocationCategory, BomLine, CompEntry, CostMethod, Employee, GlobalAllocation, InputItem,
    Month, MonthlyIndirect, MonthlyProduction, PriceEntry, Product, Recipe, RecipeBase,
    RecipeItem, RecipeScope, VolumetricParam, YieldConfig, YieldModel,
};
use crate::store::InMemoryStore;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn month(y: i32, m: u32) -> Month {
    Month::new(y, m).unwrap()
}

pub fn store_with(snapshot: ReferenceSnapshot) -> InMemoryStore {
    InMemoryStore::new(snapshot)
}

pub fn input(id: &str, current: &str) -> InputItem {
    InputItem {
        id: id.to_string(),
        name: id.to_string(),
        unit: None,
        current_price: dec(current),
    }
}

pub fn price_change(id: &str, price: &str, effective_from: NaiveDateTime) -> PriceEntry {
    PriceEntry {
        input_id: id.to_string(),
        price: dec(price),
        effective_from,
    }
}

pub fn employee(id: &str, gross: &str, taxes: &str, active: bool) -> Employee {
    Employee {
        id: id.to_string(),
        name: id.to_string(),
        active,
        gross_salary: dec(gross),
        payroll_taxes: dec(taxes),
    }
}

pub fn recipe(
    id: &str,
    scope: RecipeScope,
    scope_id: &str,
    base: RecipeBase,
    items: &[(&str, &str)],
) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: id.to_string(),
        scope,
        scope_id: scope_id.to_string(),
        base,
        active: true,
        items: items
            .iter()
            .map(|(input_id, quantity)| RecipeItem {
                input_id: input_id.to_string(),
                quantity: dec(quantity),
            })
            .collect(),
    }
}

pub fn product(id: &str, line_id: &str, cost_method: CostMethod) -> Product {
    Product {
        id: id.to_string(),
        name: id.to_string(),
        company_id: Some("acme".to_string()),
        line_id: line_id.to_string(),
        active: true,
        cost_method,
        yield_config: None,
        volumetric: None,
        bom: vec![],
    }
}

pub fn direct_yield(outputs: &str, scrap: &str) -> YieldConfig {
    YieldConfig {
        model: YieldModel::Direct {
            outputs_per_batch: dec(outputs),
            scrap_global: dec(scrap),
        },
        m3_per_batch: None,
    }
}

pub fn chained_yield(
    intermediates: &str,
    scrap_a: &str,
    outputs_per_intermediate: &str,
    scrap_b: &str,
) -> YieldConfig {
    YieldConfig {
        model: YieldModel::Chained {
            intermediates_per_batch: dec(intermediates),
            scrap_a: dec(scrap_a),
            outputs_per_intermediate: dec(outputs_per_intermediate),
            scrap_b: dec(scrap_b),
        },
        m3_per_batch: None,
    }
}

pub fn allocation(category: AllocationCategory, line_id: &str, percent: &str) -> GlobalAllocation {
    GlobalAllocation {
        category,
        line_id: line_id.to_string(),
        percent: dec(percent),
    }
}

pub fn produced(product_id: &str, line_id: &str, m: Month, quantity: &str) -> MonthlyProduction {
    MonthlyProduction {
        product_id: product_id.to_string(),
        line_id: line_id.to_string(),
        month: m,
        quantity: dec(quantity),
    }
}

/// Two lines, four products, March 2025 figures.
///
/// line_blocks: indirect 0.25, labor 0.4, 500 units produced.
/// line_precast: indirect 0.75, labor 0.6, 250 units produced.
/// Indirect pool 40000; labor pool 3250 + 2600 = 5850.
pub fn plant_snapshot() -> ReferenceSnapshot {
    let march = month(2025, 3);

    let mut block = product("prd_block", "line_blocks", CostMethod::Batch);
    block.yield_config = Some(direct_yield("100", "0.1"));

    let mut paver = product("prd_paver", "line_blocks", CostMethod::Batch);
    let mut paver_yield = chained_yield("10", "0.2", "25", "0.2");
    paver_yield.m3_per_batch = Some(dec("2"));
    paver.yield_config = Some(paver_yield);

    let mut slab = product("prd_slab", "line_precast", CostMethod::Volumetric);
    slab.volumetric = Some(VolumetricParam {
        m3_per_output: dec("0.5"),
    });

    let mut kit = product("prd_kit", "line_precast", CostMethod::PerUnitBom);
    kit.bom = vec![
        BomLine {
            input_id: "steel".to_string(),
            quantity_per_output: dec("2"),
        },
        BomLine {
            input_id: "bolt".to_string(),
            quantity_per_output: dec("4"),
        },
    ];

    ReferenceSnapshot {
        inputs: vec![
            input("cement", "0.16"),
            input("sand", "0.03"),
            input("water", "0.002"),
            input("steel", "2.5"),
            input("bolt", "0.4"),
        ],
        price_history: vec![
            price_change("cement", "0.12", at(2025, 1, 1)),
            price_change("cement", "0.14", at(2025, 3, 15)),
            price_change("cement", "0.15", at(2025, 4, 1)),
            price_change("water", "0.001", at(2024, 6, 1)),
        ],
        employees: vec![
            employee("emp_ana", "3000", "900", true),
            employee("emp_luis", "2000", "600", true),
            employee("emp_marta", "5000", "1500", false),
        ],
        comp_history: vec![
            CompEntry {
                employee_id: "emp_ana".to_string(),
                gross_salary: dec("2500"),
                payroll_taxes: dec("750"),
                effective_from: at(2025, 1, 1),
            },
            CompEntry {
                employee_id: "emp_ana".to_string(),
                gross_salary: dec("2800"),
                payroll_taxes: dec("840"),
                effective_from: at(2025, 4, 1),
            },
        ],
        recipes: vec![
            recipe(
                "rcp_block",
                RecipeScope::Product,
                "prd_block",
                RecipeBase::PerBatch,
                &[("cement", "5000"), ("sand", "9900"), ("water", "3000")],
            ),
            recipe(
                "rcp_line_blocks",
                RecipeScope::Line,
                "line_blocks",
                RecipeBase::PerM3,
                &[("cement", "300"), ("sand", "1200"), ("water", "2000")],
            ),
            recipe(
                "rcp_slab",
                RecipeScope::Product,
                "prd_slab",
                RecipeBase::PerM3,
                &[("cement", "350"), ("sand", "1000"), ("water", "1000")],
            ),
        ],
        products: vec![block, paver, slab, kit],
        allocations: vec![
            allocation(AllocationCategory::Indirect, "line_blocks", "0.25"),
            allocation(AllocationCategory::Indirect, "line_precast", "0.75"),
            allocation(AllocationCategory::Labor, "line_blocks", "0.4"),
            allocation(AllocationCategory::Labor, "line_precast", "0.6"),
        ],
        production: vec![
            produced("prd_block", "line_blocks", march, "300"),
            produced("prd_paver", "line_blocks", march, "200"),
            produced("prd_slab", "line_precast", march, "100"),
            produced("prd_kit", "line_precast", march, "150"),
        ],
        indirects: vec![
            MonthlyIndirect {
                month: march,
                concept: "rent".to_string(),
                amount: dec("30000"),
            },
            MonthlyIndirect {
                month: march,
                concept: "energy".to_string(),
                amount: dec("10000"),
            },
        ],
    }
}
