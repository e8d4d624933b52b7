//! Prometheus metrics

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Open position count
    OpenPositions,
    /// Total exposure
    TotalExposure,
    /// Realized P&L
    RealizedPnl,
    /// Unrealized P&L
    UnrealizedPnl,
    /// Accumulated loss since the last day boundary
    DailyLoss,
    /// Consecutive losing closes
    LossStreak,
    /// Trades since the last day boundary
    DailyTrades,
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::OpenPositions => "polycrowd_open_positions",
        GaugeMetric::TotalExposure => "polycrowd_total_exposure_usd",
        GaugeMetric::RealizedPnl => "polycrowd_realized_pnl_usd",
        GaugeMetric::UnrealizedPnl => "polycrowd_unrealized_pnl_usd",
        GaugeMetric::DailyLoss => "polycrowd_daily_loss_usd",
        GaugeMetric::LossStreak => "polycrowd_loss_streak",
        GaugeMetric::DailyTrades => "polycrowd_daily_trades",
    };

    metrics::gauge!(metric_name).set(value);
}

/// Count an executed trade
pub fn count_trade(simulated: bool) {
    let metric_name = if simulated {
        "polycrowd_trades_simulated_total"
    } else {
        "polycrowd_trades_live_total"
    };
    metrics::counter!(metric_name).increment(1);
}

/// Count a completed scan tick
pub fn count_tick() {
    metrics::counter!("polycrowd_ticks_total").increment(1);
}
