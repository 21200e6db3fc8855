// 10.0: settlement-asset treasury boundary. the real mint/burn bookkeeping and
// system-wide debt aggregation live outside this crate; the engine only needs to
// burn collateral on deposit, issue it on withdrawal/payout, and route fees.
// the in-memory implementation here is the test double, same role the mocked
// custody/settlement integrations play elsewhere in this codebase family.

use crate::types::{AccountId, Quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub trait Treasury {
    /// Burn up to `amount` of the settlement asset from `account` and return the
    /// amount actually realized. asset-specific reclamation or fee-on-burn means
    /// this may be less than requested; accounting must use the realized amount.
    fn burn(&mut self, account: AccountId, amount: Quote) -> Quote;

    /// Mint `amount` of the settlement asset to `account`.
    fn issue(&mut self, account: AccountId, amount: Quote);

    /// Mint `amount` to the protocol fee pool.
    fn issue_to_fee_pool(&mut self, amount: Quote);
}

/// In-memory treasury: plain balances plus running totals for debt views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryTreasury {
    balances: HashMap<AccountId, Quote>,
    fee_pool: Quote,
    total_burned: Quote,
    total_issued: Quote,
    /// Fraction of a burn lost to reclamation (0 = full realization).
    burn_reclamation: Decimal,
}

impl InMemoryTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treasury whose burns realize less than requested, for exercising the
    /// realized-amount accounting path.
    pub fn with_burn_reclamation(fraction: Decimal) -> Self {
        debug_assert!(fraction >= Decimal::ZERO && fraction < Decimal::ONE);
        Self {
            burn_reclamation: fraction,
            ..Self::default()
        }
    }

    pub fn credit(&mut self, account: AccountId, amount: Quote) {
        let balance = self.balances.entry(account).or_insert_with(Quote::zero);
        *balance = balance.add(amount);
    }

    pub fn balance(&self, account: AccountId) -> Quote {
        self.balances.get(&account).copied().unwrap_or_else(Quote::zero)
    }

    pub fn fee_pool(&self) -> Quote {
        self.fee_pool
    }

    pub fn total_burned(&self) -> Quote {
        self.total_burned
    }

    pub fn total_issued(&self) -> Quote {
        self.total_issued
    }
}

impl Treasury for InMemoryTreasury {
    fn burn(&mut self, account: AccountId, amount: Quote) -> Quote {
        let balance = self.balances.entry(account).or_insert_with(Quote::zero);
        let burnable = amount.min(*balance);
        *balance = balance.sub(burnable);
        self.total_burned = self.total_burned.add(burnable);

        let reclaimed = Quote::new(burnable.value() * self.burn_reclamation);
        burnable.sub(reclaimed)
    }

    fn issue(&mut self, account: AccountId, amount: Quote) {
        let balance = self.balances.entry(account).or_insert_with(Quote::zero);
        *balance = balance.add(amount);
        self.total_issued = self.total_issued.add(amount);
    }

    fn issue_to_fee_pool(&mut self, amount: Quote) {
        self.fee_pool = self.fee_pool.add(amount);
        self.total_issued = self.total_issued.add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn burn_is_capped_by_balance() {
        let mut treasury = InMemoryTreasury::new();
        treasury.credit(AccountId(1), Quote::new(dec!(100)));

        let realized = treasury.burn(AccountId(1), Quote::new(dec!(250)));
        assert_eq!(realized.value(), dec!(100));
        assert_eq!(treasury.balance(AccountId(1)), Quote::zero());
    }

    #[test]
    fn reclamation_shrinks_the_realized_amount() {
        let mut treasury = InMemoryTreasury::with_burn_reclamation(dec!(0.1));
        treasury.credit(AccountId(1), Quote::new(dec!(100)));

        let realized = treasury.burn(AccountId(1), Quote::new(dec!(100)));
        assert_eq!(realized.value(), dec!(90));
        // the full 100 left the account even though only 90 was realized
        assert_eq!(treasury.balance(AccountId(1)), Quote::zero());
    }

    #[test]
    fn fee_pool_accumulates() {
        let mut treasury = InMemoryTreasury::new();
        treasury.issue_to_fee_pool(Quote::new(dec!(15)));
        treasury.issue_to_fee_pool(Quote::new(dec!(5)));
        assert_eq!(treasury.fee_pool().value(), dec!(20));
    }
}
