//! End-to-end worker scenarios against the paper broker.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bartrader_broker::PaperBroker;
use bartrader_core::traits::EventSink;
use bartrader_core::types::{
    CandleClosed, HaColor, OrderKind, OrderPlaced, Period, RawBar, Side,
};
use bartrader_engine::{
    ClientIdPool, Engine, OrderIdAllocator, TimeSource, WorkerExit, WorkerPorts, WorkerSettings,
};
use bartrader_strategies::StrategyKind;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

const SYMBOL: &str = "SPY";

#[derive(Default)]
struct RecordingSink {
    candles: Mutex<Vec<CandleClosed>>,
    orders: Mutex<Vec<OrderPlaced>>,
}

impl EventSink for RecordingSink {
    fn candle_closed(&self, event: &CandleClosed) {
        self.candles.lock().unwrap().push(event.clone());
    }

    fn order_placed(&self, event: &OrderPlaced) {
        self.orders.lock().unwrap().push(event.clone());
    }
}

impl RecordingSink {
    fn live_colors(&self) -> Vec<HaColor> {
        self.candles
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !c.historical)
            .filter_map(|c| c.candle.heikin_ashi().map(|ha| ha.ha_color))
            .collect()
    }

    fn orders(&self) -> Vec<OrderPlaced> {
        self.orders.lock().unwrap().clone()
    }
}

fn settings(strategy: StrategyKind, size: Decimal) -> WorkerSettings {
    WorkerSettings {
        period: Period::from_secs(10),
        sub_period_secs: 5,
        quote_wait: Duration::from_millis(20),
        clock: TimeSource::Candle,
        ..WorkerSettings::new(SYMBOL, strategy, size)
    }
}

/// Run one worker over the scripted feed until the feed ends.
async fn replay(broker: &PaperBroker, settings: WorkerSettings) -> Arc<RecordingSink> {
    let sink = Arc::new(RecordingSink::default());
    let mut engine = Engine::new(WorkerPorts {
        broker: Arc::new(broker.clone()),
        feed: Arc::new(broker.clone()),
        sink: sink.clone(),
        sessions: Arc::new(ClientIdPool::new(4)),
        order_ids: Arc::new(OrderIdAllocator::new(1)),
    });
    engine.start(settings).unwrap();

    for _ in 0..200 {
        if !broker.sessions().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    broker.close_feed(SYMBOL);

    let outcomes = engine.join_all().await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].1.as_ref().unwrap(), &WorkerExit::FeedEnded);
    sink
}

/// Two 5s sub-bars per 10s window; colors Green, Green, Red, Red.
fn ha_green_green_red_red() -> Vec<RawBar> {
    vec![
        RawBar::new(0, 10.0, 14.0, 10.0, 12.0),
        RawBar::new(5, 12.0, 12.0, 10.0, 11.0),
        RawBar::new(10, 11.0, 13.0, 11.0, 12.0),
        RawBar::new(15, 12.0, 13.0, 11.0, 13.0),
        RawBar::new(20, 13.0, 13.0, 11.0, 11.0),
        RawBar::new(25, 11.0, 11.0, 9.0, 9.0),
        RawBar::new(30, 9.0, 9.0, 8.0, 8.0),
        RawBar::new(35, 8.0, 8.0, 7.0, 7.0),
    ]
}

/// A single Red window.
fn ha_red() -> Vec<RawBar> {
    vec![
        RawBar::new(0, 12.0, 12.0, 10.0, 11.5),
        RawBar::new(5, 11.5, 11.5, 8.0, 11.0),
    ]
}

fn flat(start: i64, price: f64) -> RawBar {
    RawBar::new(start, price, price, price, price)
}

/// Falls, then turns up: the regression line crosses above the EMA once.
fn history_with_upward_cross() -> Vec<RawBar> {
    [10.0, 9.0, 8.0, 7.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]
        .iter()
        .enumerate()
        .map(|(i, close)| flat(i as i64 * 10, *close))
        .collect()
}

fn ema_lrc_settings(size: Decimal) -> WorkerSettings {
    WorkerSettings {
        strategy_params: json!({ "ema_periods": 2, "lrc_periods": 3 }),
        ..settings(StrategyKind::EmaLrc, size)
    }
}

#[tokio::test]
async fn scenario_a_heikin_ashi_flip() {
    let broker = PaperBroker::new();
    broker.set_live_bars(SYMBOL, ha_green_green_red_red());

    let sink = replay(&broker, settings(StrategyKind::HeikinAshi, dec!(100))).await;

    assert_eq!(
        sink.live_colors(),
        vec![HaColor::Green, HaColor::Green, HaColor::Red, HaColor::Red]
    );

    let orders = sink.orders();
    assert_eq!(orders.len(), 2);

    assert_eq!(orders[0].candle_time, 10);
    assert_eq!(orders[0].side, Side::Buy);
    assert_eq!(orders[0].quantity, dec!(100));

    assert_eq!(orders[1].candle_time, 30);
    assert_eq!(orders[1].side, Side::Sell);
    assert_eq!(orders[1].quantity, dec!(200));

    assert_eq!(orders[0].order_id, 1);
    assert_eq!(orders[1].order_id, 2);
    assert_eq!(broker.net_position_of(SYMBOL), dec!(-100));
}

#[tokio::test]
async fn scenario_a_orders_outside_hours_are_limit() {
    let broker = PaperBroker::new();
    broker.set_live_bars(SYMBOL, ha_green_green_red_red());

    replay(&broker, settings(StrategyKind::HeikinAshi, dec!(100))).await;

    let sent = broker.submitted(SYMBOL);
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|o| o.kind == OrderKind::Limit));
    assert!(sent.iter().all(|o| o.outside_regular_hours));
    // Last price of the bar that closed each window, not of bars still queued.
    assert_eq!(sent[0].limit_price, Some(dec!(11)));
    assert_eq!(sent[1].limit_price, Some(dec!(9)));
}

#[tokio::test]
async fn scenario_b_history_crossover_flips_short() {
    let broker = PaperBroker::new();
    broker.set_position(SYMBOL, dec!(-100));
    broker.set_history(SYMBOL, history_with_upward_cross());
    broker.set_live_bars(SYMBOL, vec![flat(100, 12.0), flat(105, 12.0)]);

    let sink = replay(&broker, ema_lrc_settings(dec!(100))).await;

    let orders = sink.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, Side::Buy);
    assert_eq!(orders[0].quantity, dec!(200));
    assert_eq!(orders[0].candle_time, 110);
    assert_eq!(orders[0].price, Some(dec!(12)));
    assert_eq!(broker.net_position_of(SYMBOL), dec!(100));

    let historical = sink
        .candles
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.historical)
        .count();
    assert_eq!(historical, 10);
}

#[tokio::test]
async fn scenario_b_consistent_position_holds() {
    let broker = PaperBroker::new();
    broker.set_position(SYMBOL, dec!(100));
    broker.set_history(SYMBOL, history_with_upward_cross());
    broker.set_live_bars(SYMBOL, vec![flat(100, 12.0), flat(105, 12.0)]);

    let sink = replay(&broker, ema_lrc_settings(dec!(100))).await;

    assert!(sink.orders().is_empty());
    assert_eq!(broker.net_position_of(SYMBOL), dec!(100));
}

#[tokio::test]
async fn scenario_b_flat_opens_base_size() {
    let broker = PaperBroker::new();
    broker.set_history(SYMBOL, history_with_upward_cross());
    broker.set_live_bars(SYMBOL, vec![flat(100, 12.0), flat(105, 12.0)]);

    let sink = replay(&broker, ema_lrc_settings(dec!(100))).await;

    let orders = sink.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, Side::Buy);
    assert_eq!(orders[0].quantity, dec!(100));
}

#[tokio::test]
async fn scenario_c_sell_blocked_without_shortable_shares() {
    let broker = PaperBroker::new();
    broker.set_shortable(SYMBOL, dec!(50));
    broker.set_live_bars(SYMBOL, ha_red());

    let sink = replay(&broker, settings(StrategyKind::HeikinAshi, dec!(200))).await;

    assert_eq!(sink.live_colors(), vec![HaColor::Red]);
    assert!(sink.orders().is_empty());
    assert!(broker.orders().is_empty());
    assert_eq!(broker.net_position_of(SYMBOL), Decimal::ZERO);
}

#[tokio::test]
async fn scenario_c_flip_capped_to_base_size() {
    let broker = PaperBroker::new();
    broker.set_position(SYMBOL, dec!(100));
    broker.set_shortable(SYMBOL, dec!(50));
    broker.set_live_bars(SYMBOL, ha_red());

    let sink = replay(&broker, settings(StrategyKind::HeikinAshi, dec!(100))).await;

    let orders = sink.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, Side::Sell);
    assert_eq!(orders[0].quantity, dec!(100));
    assert_eq!(broker.net_position_of(SYMBOL), Decimal::ZERO);
}

#[tokio::test]
async fn partial_first_window_is_skipped() {
    let broker = PaperBroker::new();
    // Joins mid-window: the sub-bar at 5 alone cannot make a candle.
    let mut bars = vec![RawBar::new(5, 10.0, 10.0, 10.0, 10.0)];
    bars.extend(
        ha_green_green_red_red()
            .into_iter()
            .map(|b| RawBar { start_time: b.start_time + 10, ..b }),
    );
    broker.set_live_bars(SYMBOL, bars);

    let sink = replay(&broker, settings(StrategyKind::HeikinAshi, dec!(100))).await;

    assert_eq!(sink.live_colors().len(), 4);
    assert_eq!(sink.orders()[0].candle_time, 20);
}
