use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::config::types::PricingConfig;
use crate::domain::calendar::{CalendarDayPatch, NewCalendarDay};
use crate::domain::payment::PaymentMode;
use crate::domain::selection::StaySelection;
use crate::error::{BookingError, Result as BookingResult};
use crate::ports::booking_store::BookingStore;
use crate::service::{
    BookingService, CalendarQuery, CalendarService, ChargeOverrides, DisplayCurrency,
};

// ---------- Tool parameter types ----------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CalendarToolParams {
    /// Villa ID
    pub villa_id: String,
    /// First date to include (YYYY-MM-DD). Must be paired with end_date.
    pub start_date: Option<String>,
    /// Last date to include (YYYY-MM-DD). Must be paired with start_date.
    pub end_date: Option<String>,
    /// Only days with this status: AVAILABLE, PENDING, RESERVED or BLOCKED
    pub status: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct StayToolParams {
    /// Villa ID
    pub villa_id: String,
    /// Check-in date (YYYY-MM-DD), the first night of the stay
    pub check_in: String,
    /// Check-out date (YYYY-MM-DD), not a night of the stay
    pub check_out: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct PriceBreakdownToolParams {
    /// Villa ID
    pub villa_id: String,
    /// Check-in date (YYYY-MM-DD)
    pub check_in: String,
    /// Check-out date (YYYY-MM-DD)
    pub check_out: String,
    /// Cleaning fee to use instead of the villa's (decimal string, e.g. "50")
    pub cleaning_fee: Option<String>,
    /// Stays shorter than this many nights pay the cleaning fee
    pub short_stay_day_limit: Option<u32>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct QuoteToolParams {
    /// Villa ID
    pub villa_id: String,
    /// Check-in date (YYYY-MM-DD)
    pub check_in: String,
    /// Check-out date (YYYY-MM-DD)
    pub check_out: String,
    /// FULL (default) or ADVANCE
    pub payment_mode: Option<String>,
    /// Share paid up front in ADVANCE mode, in (0, 1] (decimal string, default from config)
    pub advance_rate: Option<String>,
    /// Currency code to also show the amounts in. Requires exchange_rate.
    pub display_currency: Option<String>,
    /// Units of display_currency per unit of the villa's currency
    pub exchange_rate: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CreateDayToolParams {
    /// Villa ID
    pub villa_id: String,
    /// Date (YYYY-MM-DD), unique per villa
    pub date: String,
    /// AVAILABLE (default), PENDING, RESERVED or BLOCKED
    pub status: Option<String>,
    /// Non-negative nightly price (number or numeric string)
    pub price: Option<Value>,
    /// Free-text note
    pub note: Option<String>,
    /// CHECKIN, CHECKOUT or SPECIAL_OFFER (a one-element list is accepted)
    pub event_type: Option<Value>,
    /// Reservation this day belongs to
    pub reservation_id: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct UpdateDayToolParams {
    /// Calendar day ID
    pub id: String,
    /// Fields to change. Omitted fields are untouched; null clears price, note,
    /// event_type and reservation_id.
    pub changes: Value,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct DeleteDayToolParams {
    /// Calendar day ID
    pub id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct RangeUpdateToolParams {
    /// Villa ID
    pub villa_id: String,
    /// First date (YYYY-MM-DD), inclusive
    pub start_date: String,
    /// Last date (YYYY-MM-DD), inclusive
    pub end_date: String,
    /// Same shape as calendar_day_update changes; date is not allowed
    pub changes: Value,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ProjectionToolParams {
    /// Villa ID
    pub villa_id: String,
    /// First date (YYYY-MM-DD), inclusive
    pub start_date: String,
    /// Last date (YYYY-MM-DD), inclusive
    pub end_date: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SelectDateToolParams {
    /// Villa ID
    pub villa_id: String,
    /// Selection returned by the previous call; omit to start over
    pub selection: Option<Value>,
    /// Clicked date (YYYY-MM-DD)
    pub date: String,
}

// ---------- Helpers ----------

/// Tool error text starts with the error category so callers can branch on it.
fn tool_error(action: &str, error: &BookingError) -> CallToolResult {
    tracing::debug!(action, code = error.kind().code(), error = %error, "Tool call failed");
    CallToolResult::error(vec![Content::text(format!(
        "[{}] {action} failed: {error}",
        error.kind().category()
    ))])
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

fn json_result(value: &impl Serialize) -> BookingResult<CallToolResult> {
    Ok(text_result(serde_json::to_string_pretty(value)?))
}

fn parse_decimal(field: &str, raw: &str) -> BookingResult<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| BookingError::bad_request(format!("{field} must be a decimal number")))
}

fn parse_optional_decimal(field: &str, raw: Option<&str>) -> BookingResult<Option<Decimal>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_decimal(field, s))
        .transpose()
}

fn parse_patch(changes: Value) -> BookingResult<CalendarDayPatch> {
    if !changes.is_object() {
        return Err(BookingError::bad_request("changes must be a JSON object"));
    }
    serde_json::from_value(changes)
        .map_err(|e| BookingError::bad_request(format!("invalid changes: {e}")))
}

#[derive(Clone)]
pub struct VillaMcpServer {
    calendar: CalendarService,
    booking: BookingService,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl VillaMcpServer {
    pub fn new(store: Arc<dyn BookingStore>, pricing: PricingConfig) -> Self {
        Self {
            calendar: CalendarService::new(Arc::clone(&store)),
            booking: BookingService::new(store, pricing),
            tool_router: Self::tool_router(),
        }
    }

    /// List calendar days for a villa.
    #[tool(
        name = "villa_calendar",
        description = "List calendar days of a villa ordered by date, with status, nightly price and event type. Optionally restrict to an inclusive date range (start_date and end_date together) and a status.",
        annotations(read_only_hint = true)
    )]
    async fn villa_calendar(
        &self,
        Parameters(params): Parameters<CalendarToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let query = CalendarQuery {
            villa_id: params.villa_id,
            start_date: params.start_date,
            end_date: params.end_date,
            status: params.status,
        };
        match self.calendar.list_days(&query).await {
            Ok(days) if days.is_empty() => Ok(text_result(format!(
                "No calendar days found for villa {}.",
                query.villa_id
            ))),
            Ok(days) => {
                let mut text = format!("{} days for villa {}:\n\n", days.len(), query.villa_id);
                let _ = writeln!(
                    text,
                    "{:<12} {:<10} {:>10} {:<14} ID",
                    "Date", "Status", "Price", "Event"
                );
                for day in &days {
                    let _ = writeln!(text, "{day} {}", day.id);
                }
                Ok(text_result(text))
            }
            Err(e) => Ok(tool_error("Calendar listing", &e)),
        }
    }

    /// Check whether every night of a stay is bookable.
    #[tool(
        name = "villa_stay_availability",
        description = "Check whether every night from check_in (inclusive) to check_out (exclusive) is AVAILABLE. Reports the first unavailable night. Nights without a calendar row count as unavailable.",
        annotations(read_only_hint = true)
    )]
    async fn villa_stay_availability(
        &self,
        Parameters(params): Parameters<StayToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self
            .booking
            .evaluate_stay_availability(&params.villa_id, &params.check_in, &params.check_out)
            .await
        {
            Ok(result) => Ok(text_result(result.to_string())),
            Err(e) => Ok(tool_error("Availability check", &e)),
        }
    }

    /// Per-night price breakdown without the availability check.
    #[tool(
        name = "villa_price_breakdown",
        description = "Price each night of a stay and apply the short-stay cleaning fee. Does not check availability; use villa_price_quote for a bookable quote.",
        annotations(read_only_hint = true)
    )]
    async fn villa_price_breakdown(
        &self,
        Parameters(params): Parameters<PriceBreakdownToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let overrides = match parse_optional_decimal("cleaning_fee", params.cleaning_fee.as_deref())
        {
            Ok(cleaning_fee) => ChargeOverrides {
                cleaning_fee,
                short_stay_day_limit: params.short_stay_day_limit,
            },
            Err(e) => return Ok(tool_error("Price calculation", &e)),
        };
        match self
            .booking
            .calculate_price(&params.villa_id, &params.check_in, &params.check_out, overrides)
            .await
        {
            Ok(price) => Ok(text_result(price.to_string())),
            Err(e) => Ok(tool_error("Price calculation", &e)),
        }
    }

    /// Full quote: minimum stay, availability, price and payment split.
    #[tool(
        name = "villa_price_quote",
        description = "Quote a stay: checks the villa's minimum stay and that every night is available, prices each night, applies the short-stay cleaning fee and splits the total into due-now and due-later for FULL or ADVANCE payment.",
        annotations(read_only_hint = true)
    )]
    async fn villa_price_quote(
        &self,
        Parameters(params): Parameters<QuoteToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self.quote(params).await {
            Ok(text) => Ok(text_result(text)),
            Err(e) => Ok(tool_error("Quote", &e)),
        }
    }

    async fn quote(&self, params: QuoteToolParams) -> BookingResult<String> {
        let mode = params
            .payment_mode
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map_or(Ok(PaymentMode::Full), PaymentMode::from_str)?;
        let advance_rate = parse_optional_decimal("advance_rate", params.advance_rate.as_deref())?;
        let rate = parse_optional_decimal("exchange_rate", params.exchange_rate.as_deref())?;
        let display = match (params.display_currency, rate) {
            (Some(code), Some(rate)) => Some(DisplayCurrency { code, rate }),
            (None, None) => None,
            _ => {
                return Err(BookingError::bad_request(
                    "display_currency and exchange_rate must be given together",
                ));
            }
        };
        let quote = self
            .booking
            .quote_stay(
                &params.villa_id,
                &params.check_in,
                &params.check_out,
                mode,
                advance_rate,
                display,
            )
            .await?;
        Ok(quote.to_string())
    }

    /// Create one calendar day.
    #[tool(
        name = "calendar_day_create",
        description = "Create a calendar day for a villa. Fails with conflict if the villa already has a day on that date, not_found if the villa does not exist, bad_request for invalid fields or an unknown reservation.",
        annotations(read_only_hint = false, idempotent_hint = false)
    )]
    async fn calendar_day_create(
        &self,
        Parameters(params): Parameters<CreateDayToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let input = NewCalendarDay {
            villa_id: Some(params.villa_id),
            date: Some(params.date),
            status: params.status,
            price: params.price,
            note: params.note,
            event_type: params.event_type,
            reservation_id: params.reservation_id,
        };
        match self.calendar.create_day(input).await.and_then(|d| json_result(&d)) {
            Ok(result) => Ok(result),
            Err(e) => Ok(tool_error("Calendar day creation", &e)),
        }
    }

    /// Partially update one calendar day.
    #[tool(
        name = "calendar_day_update",
        description = "Update fields of a calendar day. Omitted fields stay as they are; null clears price, note, event_type or reservation_id. villa_id cannot change; date and status cannot be null.",
        annotations(read_only_hint = false, idempotent_hint = true)
    )]
    async fn calendar_day_update(
        &self,
        Parameters(params): Parameters<UpdateDayToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = match parse_patch(params.changes) {
            Ok(patch) => self.calendar.update_day(&params.id, patch).await,
            Err(e) => Err(e),
        };
        match result.and_then(|d| json_result(&d)) {
            Ok(result) => Ok(result),
            Err(e) => Ok(tool_error("Calendar day update", &e)),
        }
    }

    /// Delete one calendar day.
    #[tool(
        name = "calendar_day_delete",
        description = "Delete a calendar day by ID. Returns the deleted day's id, villa_id and date.",
        annotations(destructive_hint = true)
    )]
    async fn calendar_day_delete(
        &self,
        Parameters(params): Parameters<DeleteDayToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self.calendar.delete_day(&params.id).await.and_then(|d| json_result(&d)) {
            Ok(result) => Ok(result),
            Err(e) => Ok(tool_error("Calendar day deletion", &e)),
        }
    }

    /// Apply one change set to every date in a range.
    #[tool(
        name = "calendar_range_update",
        description = "Apply the same changes to every date of an inclusive range (at most 366 days), creating missing days. Each date succeeds or fails independently; failures are listed with their category.",
        annotations(read_only_hint = false, idempotent_hint = true)
    )]
    async fn calendar_range_update(
        &self,
        Parameters(params): Parameters<RangeUpdateToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = match parse_patch(params.changes) {
            Ok(patch) => {
                self.calendar
                    .update_range(&params.villa_id, &params.start_date, &params.end_date, patch)
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(report) => Ok(text_result(report.to_string())),
            Err(e) => Ok(tool_error("Range update", &e)),
        }
    }

    /// Fill unpriced calendar days from the seasonal price table.
    #[tool(
        name = "seasonal_price_projection",
        description = "Write the villa's active seasonal nightly prices onto days in an inclusive range that have no price, creating AVAILABLE days where none exist. Days with a price are skipped; days outside every season are reported.",
        annotations(read_only_hint = false, idempotent_hint = true)
    )]
    async fn seasonal_price_projection(
        &self,
        Parameters(params): Parameters<ProjectionToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self
            .calendar
            .project_seasonal_prices(&params.villa_id, &params.start_date, &params.end_date)
            .await
        {
            Ok(report) => Ok(text_result(report.to_string())),
            Err(e) => Ok(tool_error("Seasonal price projection", &e)),
        }
    }

    /// Step the check-in/check-out picker.
    #[tool(
        name = "villa_select_date",
        description = "Feed a clicked date into a check-in/check-out selection. The first date anchors check-in; a later date becomes check-out if the minimum stay is met and every night is available; an earlier date re-anchors. Pass back the returned selection on the next call.",
        annotations(read_only_hint = true)
    )]
    async fn villa_select_date(
        &self,
        Parameters(params): Parameters<SelectDateToolParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let selection = match params.selection.filter(|v| !v.is_null()) {
            Some(raw) => match serde_json::from_value::<StaySelection>(raw) {
                Ok(selection) => selection,
                Err(e) => {
                    let e = BookingError::bad_request(format!("invalid selection: {e}"));
                    return Ok(tool_error("Date selection", &e));
                }
            },
            None => StaySelection::default(),
        };
        match self
            .booking
            .select_date(&params.villa_id, selection, &params.date)
            .await
            .and_then(|s| json_result(&s))
        {
            Ok(result) => Ok(result),
            Err(e) => Ok(tool_error("Date selection", &e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for VillaMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Villa booking server: calendar availability, nightly pricing and payment splits.\n\
                 \n\
                 ## Reading\n\
                 - villa_calendar: calendar days of a villa, optionally by date range and status\n\
                 - villa_stay_availability: whether every night of a stay is AVAILABLE\n\
                 - villa_price_breakdown: per-night prices, short-stay cleaning fee, totals\n\
                 - villa_price_quote: bookable quote with FULL or ADVANCE payment split\n\
                 - villa_select_date: step a check-in/check-out picker\n\
                 \n\
                 ## Writing\n\
                 - calendar_day_create / calendar_day_update / calendar_day_delete\n\
                 - calendar_range_update: same changes over a date range\n\
                 - seasonal_price_projection: fill unpriced days from seasonal prices\n\
                 \n\
                 ## Conventions\n\
                 Dates are YYYY-MM-DD. A stay covers check_in up to but not including check_out. \
                 Failed calls start with a category in brackets: bad_request, not_found, conflict, \
                 pricing_error, availability_error, store_error."
                    .into(),
            ),
        }
    }
}
