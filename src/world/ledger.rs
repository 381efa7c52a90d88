//! A simple ledger keeping everything bought and sold in memory

use crate::core::types::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    income: Vec<(Money, String)>,
    expenses: Vec<(Money, String)>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a money exchange; positive amounts are income
    pub fn record(&mut self, amount: Money, label: impl Into<String>) {
        if amount > 0 {
            self.income.push((amount, label.into()));
        } else if amount < 0 {
            self.expenses.push((amount, label.into()));
        }
    }

    pub fn income(&self) -> &[(Money, String)] {
        &self.income
    }

    pub fn expenses(&self) -> &[(Money, String)] {
        &self.expenses
    }

    pub fn total_income(&self) -> Money {
        self.income.iter().map(|(a, _)| a).sum()
    }

    pub fn total_expenses(&self) -> Money {
        self.expenses.iter().map(|(a, _)| a).sum()
    }
}
