//! # Sales Summaries
//!
//! Daily and monthly totals computed from invoices and refunds, shown on
//! the reports screen and uploaded to `daily_sales_summary` /
//! `monthly_sales_summary`.
//!
//! ```text
//! gross      = Σ subtotal of invoices created in the period
//! discounts  = Σ discount of those invoices
//! refunds    = Σ refund amounts dated in the period (exchanges excluded)
//! net        = gross - discounts - refunds
//! collected  = Σ payments dated in the period, whatever the invoice date
//! ```
//! Days are calendar days in UTC.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use ts_rs::TS;

use crate::invoice::Invoice;
use crate::money::Money;
use crate::refund::{RefundExchange, RefundExchangeKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesTotals {
    pub invoice_count: u32,
    pub gross: Money,
    pub discounts: Money,
    pub refunds: Money,
    pub net: Money,
    pub collected: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailySalesSummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[serde(flatten)]
    #[ts(flatten)]
    pub totals: SalesTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySalesSummary {
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    #[ts(flatten)]
    pub totals: SalesTotals,
}

fn totals(
    invoices: &[Invoice],
    refunds: &[RefundExchange],
    in_period: impl Fn(&DateTime<Utc>) -> bool,
) -> SalesTotals {
    let mut totals = SalesTotals::default();

    for invoice in invoices {
        if in_period(&invoice.created_at) {
            totals.invoice_count += 1;
            totals.gross += invoice.subtotal;
            totals.discounts += invoice.discount;
        }
        totals.collected += invoice
            .payments
            .iter()
            .filter(|p| in_period(&p.date))
            .map(|p| p.amount)
            .sum::<Money>();
    }

    totals.refunds = refunds
        .iter()
        .filter(|r| r.kind == RefundExchangeKind::Refund && in_period(&r.date))
        .map(|r| r.amount)
        .sum();
    totals.net = totals.gross - totals.discounts - totals.refunds;
    totals
}

pub fn daily_summary(
    date: NaiveDate,
    invoices: &[Invoice],
    refunds: &[RefundExchange],
) -> DailySalesSummary {
    DailySalesSummary {
        date,
        totals: totals(invoices, refunds, |at| at.date_naive() == date),
    }
}

pub fn monthly_summary(
    year: i32,
    month: u32,
    invoices: &[Invoice],
    refunds: &[RefundExchange],
) -> MonthlySalesSummary {
    MonthlySalesSummary {
        year,
        month,
        totals: totals(invoices, refunds, |at| at.year() == year && at.month() == month),
    }
}

/// One summary per day that has any activity, oldest first.
pub fn daily_summaries(invoices: &[Invoice], refunds: &[RefundExchange]) -> Vec<DailySalesSummary> {
    activity_dates(invoices, refunds)
        .into_iter()
        .map(|date| daily_summary(date, invoices, refunds))
        .collect()
}

/// One summary per month that has any activity, oldest first.
pub fn monthly_summaries(
    invoices: &[Invoice],
    refunds: &[RefundExchange],
) -> Vec<MonthlySalesSummary> {
    activity_dates(invoices, refunds)
        .into_iter()
        .map(|date| (date.year(), date.month()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|(year, month)| monthly_summary(year, month, invoices, refunds))
        .collect()
}

fn activity_dates(invoices: &[Invoice], refunds: &[RefundExchange]) -> BTreeSet<NaiveDate> {
    invoices
        .iter()
        .flat_map(|i| {
            std::iter::once(i.created_at.date_naive())
                .chain(i.payments.iter().map(|p| p.date.date_naive()))
        })
        .chain(refunds.iter().map(|r| r.date.date_naive()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::tests::draft;
    use crate::invoice::NewPayment;
    use crate::refund::process_refund;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_daily_and_monthly_totals() {
        let day1 = Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap();
        let day2 = day1 + Duration::days(1);

        let mut a = Invoice::create(draft(45, 20), "INV-1".into(), day1);
        let mut b = draft(30, 0);
        b.discount = Money::from_major(5);
        let b = Invoice::create(b, "INV-2".into(), day1);

        a.add_payment(NewPayment::cash(Money::from_major(25)), day2);
        let refund = process_refund(&mut a, Money::from_major(10), "Scratch", "RF-1".into(), day2)
            .unwrap();

        let invoices = vec![a, b];
        let refunds = vec![refund];

        let first = daily_summary(day1.date_naive(), &invoices, &refunds);
        assert_eq!(first.totals.invoice_count, 2);
        assert_eq!(first.totals.gross, Money::from_major(75));
        assert_eq!(first.totals.discounts, Money::from_major(5));
        assert_eq!(first.totals.net, Money::from_major(70));
        assert_eq!(first.totals.collected, Money::from_major(20));

        let second = daily_summary(day2.date_naive(), &invoices, &refunds);
        assert_eq!(second.totals.invoice_count, 0);
        assert_eq!(second.totals.refunds, Money::from_major(10));
        assert_eq!(second.totals.net, Money::from_major(-10));
        assert_eq!(second.totals.collected, Money::from_major(25));

        let month = monthly_summary(2026, 10, &invoices, &refunds);
        assert_eq!(month.totals.net, Money::from_major(60));
        assert_eq!(month.totals.collected, Money::from_major(45));

        assert_eq!(daily_summaries(&invoices, &refunds).len(), 2);
        assert_eq!(monthly_summaries(&invoices, &refunds).len(), 1);
    }
}
