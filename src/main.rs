//! Skew-funded perpetual futures engine simulation.
//!
//! Demonstrates the full accounting lifecycle: margin transfers, position
//! modification with skew-based fees, lazy funding accrual, and liquidation.

use rust_decimal_macros::dec;
use skewperp_core::*;

const DAY_MS: i64 = 86_400_000;

fn main() {
    println!("Skew-Funded Perpetual Futures Engine Simulation");
    println!("Lazy Funding, Isolated Margin, Full Lifecycle\n");

    scenario_1_open_and_close();
    scenario_2_funding_accrual();
    scenario_3_pnl_and_withdrawal();
    scenario_4_liquidation();
    scenario_5_skew_fees_and_debt();

    println!("\nAll simulations completed successfully.");
}

fn setup() -> Engine {
    let mut engine = Engine::new(EngineConfig::default());
    engine.set_time(Timestamp::from_millis(1_700_000_000_000));
    engine
        .add_market(MarketId(1), "wETH", MarketParams::default())
        .unwrap();
    engine
        .push_price(MarketId(1), Price::new_unchecked(dec!(250)), 1, false)
        .unwrap();
    engine
}

/// Deposit, open, close, withdraw.
fn scenario_1_open_and_close() {
    println!("Scenario 1: Open and Close\n");

    let mut engine = setup();
    let alice = AccountId(1);
    engine.treasury_mut().credit(alice, Quote::new(dec!(2000)));

    engine
        .transfer_margin(MarketId(1), alice, Quote::new(dec!(1000)))
        .unwrap();
    println!("  Alice deposits $1,000 margin at $250");

    let outcome = engine.modify_position(MarketId(1), alice, dec!(20)).unwrap();
    println!(
        "  Opened {} units, fee ${}, margin ${}",
        outcome.size, outcome.fee, outcome.margin
    );

    let closed = engine.close_position(MarketId(1), alice).unwrap();
    println!(
        "  Closed, fee ${}, margin left ${}",
        closed.fee, closed.margin
    );

    let accessible = engine.accessible_margin(MarketId(1), alice).unwrap();
    engine
        .transfer_margin(MarketId(1), alice, accessible.negate())
        .unwrap();
    println!(
        "  Withdrew ${}, wallet balance ${}\n",
        accessible,
        engine.treasury().balance(alice)
    );
}

/// Net-long skew accrues negative funding against the longs.
fn scenario_2_funding_accrual() {
    println!("Scenario 2: Funding Accrual\n");

    let mut engine = setup();
    let long = AccountId(1);
    let short = AccountId(2);
    for account in [long, short] {
        engine.treasury_mut().credit(account, Quote::new(dec!(5000)));
        engine
            .transfer_margin(MarketId(1), account, Quote::new(dec!(5000)))
            .unwrap();
    }

    engine.modify_position(MarketId(1), long, dec!(40)).unwrap();
    engine.modify_position(MarketId(1), short, dec!(-16)).unwrap();

    let summary = engine.market_summary(MarketId(1)).unwrap();
    println!(
        "  Skew {} units, funding rate {}/day",
        summary.market_skew, summary.current_funding_rate
    );

    engine.advance_time(DAY_MS);
    engine.recompute_funding(MarketId(1)).unwrap();

    let long_view = engine.position_summary(MarketId(1), long).unwrap();
    let short_view = engine.position_summary(MarketId(1), short).unwrap();
    println!(
        "  After one day: long accrued ${}, short accrued ${}\n",
        long_view.accrued_funding, short_view.accrued_funding
    );
}

/// Paper pnl realizes into margin on the next touch.
fn scenario_3_pnl_and_withdrawal() {
    println!("Scenario 3: PnL Realization\n");

    let mut engine = setup();
    let trader = AccountId(1);
    engine.treasury_mut().credit(trader, Quote::new(dec!(3000)));
    engine
        .transfer_margin(MarketId(1), trader, Quote::new(dec!(1000)))
        .unwrap();
    engine.modify_position(MarketId(1), trader, dec!(10)).unwrap();

    engine
        .push_price(MarketId(1), Price::new_unchecked(dec!(280)), 2, false)
        .unwrap();
    let view = engine.position_summary(MarketId(1), trader).unwrap();
    println!(
        "  Price $250 -> $280: pnl ${}, remaining margin ${}",
        view.profit_loss, view.remaining_margin
    );

    let accessible = engine.accessible_margin(MarketId(1), trader).unwrap();
    println!("  Accessible margin ${}", accessible);
    engine
        .transfer_margin(MarketId(1), trader, accessible.negate())
        .unwrap();
    println!("  Withdrawn; wallet balance ${}\n", engine.treasury().balance(trader));
}

/// An underwater long gets liquidated; the keeper collects the fee.
fn scenario_4_liquidation() {
    println!("Scenario 4: Liquidation\n");

    let mut engine = setup();
    let trader = AccountId(1);
    let keeper = AccountId(9);
    engine.treasury_mut().credit(trader, Quote::new(dec!(1000)));
    engine
        .transfer_margin(MarketId(1), trader, Quote::new(dec!(500)))
        .unwrap();
    engine.modify_position(MarketId(1), trader, dec!(16)).unwrap();

    let view = engine.position_summary(MarketId(1), trader).unwrap();
    println!(
        "  16 units long at $250, approx liquidation price ${}",
        view.approx_liquidation_price.unwrap()
    );

    engine
        .push_price(MarketId(1), Price::new_unchecked(dec!(220)), 2, false)
        .unwrap();
    assert!(engine.can_liquidate(MarketId(1), trader).unwrap());

    let outcome = engine
        .liquidate_position(MarketId(1), trader, keeper)
        .unwrap();
    println!(
        "  Liquidated at ${}: keeper fee ${}, pool share ${}",
        outcome.price, outcome.fee, outcome.pool_share
    );
    println!("  Keeper balance ${}\n", engine.treasury().balance(keeper));
}

/// Skew-reducing trades pay the maker rate; the debt view stays consistent.
fn scenario_5_skew_fees_and_debt() {
    println!("Scenario 5: Skew Fees and Market Debt\n");

    let mut engine = setup();
    let long = AccountId(1);
    let short = AccountId(2);
    for account in [long, short] {
        engine.treasury_mut().credit(account, Quote::new(dec!(10000)));
        engine
            .transfer_margin(MarketId(1), account, Quote::new(dec!(10000)))
            .unwrap();
    }

    let taker_fee = engine.order_fee(MarketId(1), dec!(30)).unwrap();
    engine.modify_position(MarketId(1), long, dec!(30)).unwrap();
    let maker_fee = engine.order_fee(MarketId(1), dec!(-10)).unwrap();
    engine.modify_position(MarketId(1), short, dec!(-10)).unwrap();
    println!(
        "  Skew-increasing fee ${} (taker), skew-reducing fee ${} (maker)",
        taker_fee, maker_fee
    );

    let sizes = engine.market_sizes(MarketId(1)).unwrap();
    let debt = engine.market_debt(MarketId(1)).unwrap();
    println!(
        "  Open interest: {} long / {} short, market debt ${}\n",
        sizes.long, sizes.short, debt
    );
}
