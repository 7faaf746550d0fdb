//! Employee model and compensation history.
//!
//! This module defines the Employee struct and the dated compensation
//! entries used to resolve what a worker cost in a given month.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monthly cost of one employee: gross salary plus employer payroll taxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compensation {
    /// Gross monthly salary.
    pub gross_salary: Decimal,
    /// Employer-side payroll taxes for the month.
    pub payroll_taxes: Decimal,
}

impl Compensation {
    /// Returns the full monthly cost (salary plus taxes).
    ///
    /// # Examples
    ///
    /// ```
    /// use cost_engine::models::Compensation;
    /// use rust_decimal::Decimal;
    ///
    /// let comp = Compensation {
    ///     gross_salary: Decimal::new(3000, 0),
    ///     payroll_taxes: Decimal::new(900, 0),
    /// };
    /// assert_eq!(comp.total(), Decimal::new(3900, 0));
    /// ```
    pub fn total(&self) -> Decimal {
        self.gross_salary + self.payroll_taxes
    }
}

/// Represents an employee whose cost is shared across production lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Only active employees participate in labor allocation.
    #[serde(default = "default_active")]
    pub active: bool,
    /// The current gross monthly salary.
    pub gross_salary: Decimal,
    /// The current employer payroll taxes.
    pub payroll_taxes: Decimal,
}

fn default_active() -> bool {
    true
}

impl Employee {
    /// Returns the employee's live compensation.
    pub fn current_compensation(&self) -> Compensation {
        Compensation {
            gross_salary: self.gross_salary,
            payroll_taxes: self.payroll_taxes,
        }
    }
}

/// One dated compensation change of an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompEntry {
    /// The employee this entry applies to.
    pub employee_id: String,
    /// Gross monthly salary from `effective_from` onward.
    pub gross_salary: Decimal,
    /// Payroll taxes from `effective_from` onward.
    pub payroll_taxes: Decimal,
    /// The instant the change took effect.
    pub effective_from: NaiveDateTime,
}

impl CompEntry {
    /// The compensation this entry sets.
    pub fn compensation(&self) -> Compensation {
        Compensation {
            gross_salary: self.gross_salary,
            payroll_taxes: self.payroll_taxes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_deserialize_employee_defaults_active() {
        let json = r#"{
            "id": "emp_001",
            "name": "Ana",
            "gross_salary": "3000.00",
            "payroll_taxes": "900.00"
        }"#;

        let employee: Employee = serde_json::from_str(json).unwrap();
        assert!(employee.active);
        assert_eq!(employee.gross_salary, dec("3000.00"));
    }

    #[test]
    fn test_deserialize_inactive_employee() {
        let json = r#"{
            "id": "emp_002",
            "name": "Luis",
            "active": false,
            "gross_salary": "2000",
            "payroll_taxes": "600"
        }"#;

        let employee: Employee = serde_json::from_str(json).unwrap();
        assert!(!employee.active);
    }

    #[test]
    fn test_current_compensation_total() {
        let employee = Employee {
            id: "emp_003".to_string(),
            name: "Marta".to_string(),
            active: true,
            gross_salary: dec("2500.50"),
            payroll_taxes: dec("750.15"),
        };
        assert_eq!(employee.current_compensation().total(), dec("3250.65"));
    }
}
