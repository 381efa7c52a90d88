//! Simulation configuration with documented constants
//!
//! All tuning values are collected here with explanations of their purpose
//! and how they interact with each other.

use crate::core::error::{Result, TavernError};
use crate::core::types::Money;
use serde::Deserialize;

/// Configuration for the simulation systems
///
/// These values pace the whole tavern: how long patrons linger, how patient
/// they are, and how quickly new customers arrive. Changing them affects
/// gameplay pacing more than correctness.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === TASK LENGTHS (ticks) ===
    /// How long an idle agent fools around before re-deciding
    pub wander_length: u32,

    /// Ticks spent emptying one drink
    pub drink_length: u32,

    /// Ticks spent eating one meal
    pub eat_length: u32,

    /// Ticks spent asleep in a bedroom
    pub sleep_length: u32,

    /// How long an employee attends a post before the duty cycles
    ///
    /// Constant-attendance posts (the counter) re-enqueue an equivalent
    /// duty when this expires, so the post only flickers closed for the
    /// couple of ticks the employee needs to pick the duty back up.
    pub serving_length: u32,

    // === PATIENCE DEADLINES (ticks) ===
    /// How long a patron waits at an unattended counter before renouncing
    pub counter_patience: u32,

    /// How long a seated patron waits for a waiter to take the order
    pub table_order_patience: u32,

    /// How long a seated patron waits for the kitchen to deliver
    ///
    /// Covers the whole cook-and-carry pipeline, so it is much larger
    /// than `table_order_patience`.
    pub meal_wait_deadline: u32,

    // === ECONOMY ===
    /// Cash a fresh tavern starts with
    pub starting_cash: Money,

    /// Construction cost per tile built
    pub build_cost_per_tile: Money,

    // === CUSTOMER SPAWNER ===
    /// Ticks before the spawner starts considering new customers
    pub spawn_warmup: u32,

    /// Divisor applied to the post-warmup tick count to get the spawn
    /// probability (percent). Smaller = crowds build faster.
    pub spawn_ramp_divisor: u32,

    /// Purse range for a freshly generated patron
    pub patron_money_min: Money,
    pub patron_money_max: Money,

    /// Upper bound on a generated patron's thirst (at least 1)
    pub patron_thirst_max: u32,

    /// Upper bound on a generated patron's hunger (0 = teetotal eaters exist)
    pub patron_hunger_max: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            wander_length: 10,
            drink_length: 20,
            eat_length: 50,
            sleep_length: 100,
            serving_length: 100,

            counter_patience: 10,
            table_order_patience: 100,
            meal_wait_deadline: 400,

            starting_cash: 2000,
            build_cost_per_tile: 10,

            spawn_warmup: 100,
            spawn_ramp_divisor: 2,
            patron_money_min: 20,
            patron_money_max: 40,
            patron_thirst_max: 3,
            patron_hunger_max: 1,
        }
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimConfig =
            toml::from_str(content).map_err(|e| TavernError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.wander_length == 0 || self.drink_length == 0 || self.eat_length == 0 {
            return Err(TavernError::Config(
                "task lengths must be positive".into(),
            ));
        }
        if self.meal_wait_deadline <= self.table_order_patience {
            return Err(TavernError::Config(format!(
                "meal_wait_deadline ({}) should exceed table_order_patience ({})",
                self.meal_wait_deadline, self.table_order_patience
            )));
        }
        if self.patron_money_min > self.patron_money_max {
            return Err(TavernError::Config(format!(
                "patron_money_min ({}) should be <= patron_money_max ({})",
                self.patron_money_min, self.patron_money_max
            )));
        }
        if self.patron_thirst_max == 0 {
            return Err(TavernError::Config(
                "patron_thirst_max must be at least 1".into(),
            ));
        }
        if self.spawn_ramp_divisor == 0 {
            return Err(TavernError::Config(
                "spawn_ramp_divisor must be positive".into(),
            ));
        }
        Ok(())
    }
}
