//! Stateless financial calculators backing the EMI, loan eligibility, rental
//! value and future value tabs.

use std::ops::RangeInclusive;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::envelope::Envelope;

/// Share of free monthly income that may go towards a new EMI.
const MAX_EMI_SHARE: f64 = 0.5;

const TENURE_YEARS: RangeInclusive<f64> = 0.5..=30.0;
const INTEREST_PERCENT: RangeInclusive<f64> = 0.0..=30.0;
const RENT_PERCENT: RangeInclusive<f64> = 0.0..=30.0;
const HORIZON_YEARS: RangeInclusive<f64> = 0.0..=50.0;
const APPRECIATION_PERCENT: RangeInclusive<f64> = 0.0..=50.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalculatorError {
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} must be a finite number >= 0")]
    Negative { field: &'static str },
}

impl IntoResponse for CalculatorError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
    }
}

fn within(
    field: &'static str,
    value: f64,
    range: RangeInclusive<f64>,
) -> Result<(), CalculatorError> {
    if value.is_finite() && range.contains(&value) {
        return Ok(());
    }
    Err(CalculatorError::OutOfRange {
        field,
        min: *range.start(),
        max: *range.end(),
    })
}

fn non_negative(field: &'static str, value: f64) -> Result<(), CalculatorError> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(CalculatorError::Negative { field })
}

/// Nearest whole unit, halves to even.
fn whole(value: f64) -> f64 {
    value.round_ties_even()
}

fn monthly_rate(annual_percent: f64) -> f64 {
    annual_percent / 100.0 / 12.0
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EmiRequest {
    pub loan_amount: f64,
    pub loan_tenure_years: f64,
    pub rate_of_interest: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmiBreakdown {
    pub monthly_emi: f64,
    pub total_amount_payable: f64,
    pub total_interest: f64,
    pub loan_amount: f64,
    pub loan_tenure_years: f64,
    pub rate_of_interest: f64,
}

pub fn emi(request: EmiRequest) -> Result<EmiBreakdown, CalculatorError> {
    non_negative("loan_amount", request.loan_amount)?;
    within("loan_tenure_years", request.loan_tenure_years, TENURE_YEARS)?;
    within("rate_of_interest", request.rate_of_interest, INTEREST_PERCENT)?;

    let r = monthly_rate(request.rate_of_interest);
    let n = request.loan_tenure_years * 12.0;
    let monthly = if r <= 0.0 {
        request.loan_amount / n
    } else {
        let growth = (1.0 + r).powf(n);
        request.loan_amount * r * growth / (growth - 1.0)
    };
    let total = monthly * n;

    Ok(EmiBreakdown {
        monthly_emi: whole(monthly),
        total_amount_payable: whole(total),
        total_interest: whole(total - request.loan_amount),
        loan_amount: request.loan_amount,
        loan_tenure_years: request.loan_tenure_years,
        rate_of_interest: request.rate_of_interest,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LoanEligibilityRequest {
    pub loan_required: f64,
    pub net_income_per_month: f64,
    #[serde(default)]
    pub existing_loan_commitments: f64,
    pub loan_tenure_years: f64,
    pub rate_of_interest: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoanEligibility {
    pub eligible: bool,
    pub message: &'static str,
    pub maximum_eligible_amount: f64,
    pub maximum_emi: f64,
    pub loan_required: f64,
}

pub fn loan_eligibility(
    request: LoanEligibilityRequest,
) -> Result<LoanEligibility, CalculatorError> {
    non_negative("loan_required", request.loan_required)?;
    non_negative("net_income_per_month", request.net_income_per_month)?;
    non_negative(
        "existing_loan_commitments",
        request.existing_loan_commitments,
    )?;
    within("loan_tenure_years", request.loan_tenure_years, TENURE_YEARS)?;
    within("rate_of_interest", request.rate_of_interest, INTEREST_PERCENT)?;

    let available = (request.net_income_per_month - request.existing_loan_commitments).max(0.0);
    let max_emi = available * MAX_EMI_SHARE;
    if max_emi <= 0.0 {
        return Ok(LoanEligibility {
            eligible: false,
            message: "Eligibility Check Failed",
            maximum_eligible_amount: 0.0,
            maximum_emi: 0.0,
            loan_required: request.loan_required,
        });
    }

    let r = monthly_rate(request.rate_of_interest);
    let n = request.loan_tenure_years * 12.0;
    let max_principal = if r <= 0.0 {
        max_emi * n
    } else {
        let growth = (1.0 + r).powf(n);
        max_emi * (growth - 1.0) / (r * growth)
    };
    let eligible = request.loan_required <= max_principal;

    Ok(LoanEligibility {
        eligible,
        message: if eligible {
            "Eligible"
        } else {
            "Eligibility Check Failed"
        },
        maximum_eligible_amount: whole(max_principal),
        maximum_emi: whole(max_emi),
        loan_required: request.loan_required,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RentalValueRequest {
    pub property_value: f64,
    pub rate_of_rent: f64,
    #[serde(default = "one_year")]
    pub years: f64,
}

fn one_year() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RentalValue {
    pub rental_value_annual: f64,
    pub rental_value_monthly: f64,
    pub property_value: f64,
    pub rate_of_rent: f64,
}

pub fn rental_value(request: RentalValueRequest) -> Result<RentalValue, CalculatorError> {
    non_negative("property_value", request.property_value)?;
    within("rate_of_rent", request.rate_of_rent, RENT_PERCENT)?;
    non_negative("years", request.years)?;

    let annual = request.property_value * request.rate_of_rent / 100.0;
    Ok(RentalValue {
        rental_value_annual: whole(annual),
        rental_value_monthly: whole(annual / 12.0),
        property_value: request.property_value,
        rate_of_rent: request.rate_of_rent,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FutureValueRequest {
    pub current_property_value: f64,
    pub years: f64,
    pub average_appreciation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FutureValue {
    pub future_value: f64,
    pub current_property_value: f64,
    pub years: f64,
    pub average_appreciation: f64,
}

pub fn future_value(request: FutureValueRequest) -> Result<FutureValue, CalculatorError> {
    non_negative("current_property_value", request.current_property_value)?;
    within("years", request.years, HORIZON_YEARS)?;
    within(
        "average_appreciation",
        request.average_appreciation,
        APPRECIATION_PERCENT,
    )?;

    let value = request.current_property_value
        * (1.0 + request.average_appreciation / 100.0).powf(request.years);
    Ok(FutureValue {
        future_value: whole(value),
        current_property_value: request.current_property_value,
        years: request.years,
        average_appreciation: request.average_appreciation,
    })
}

type Calculated<T> = Result<Json<Envelope<T>>, CalculatorError>;

async fn emi_handler(Json(request): Json<EmiRequest>) -> Calculated<EmiBreakdown> {
    Ok(Json(Envelope::ok(emi(request)?)))
}

async fn loan_eligibility_handler(
    Json(request): Json<LoanEligibilityRequest>,
) -> Calculated<LoanEligibility> {
    Ok(Json(Envelope::ok(loan_eligibility(request)?)))
}

async fn rental_value_handler(Json(request): Json<RentalValueRequest>) -> Calculated<RentalValue> {
    Ok(Json(Envelope::ok(rental_value(request)?)))
}

async fn future_value_handler(Json(request): Json<FutureValueRequest>) -> Calculated<FutureValue> {
    Ok(Json(Envelope::ok(future_value(request)?)))
}

pub fn calculator_router() -> Router {
    Router::new()
        .route("/api/financial-calculators/emi", post(emi_handler))
        .route(
            "/api/financial-calculators/loan-eligibility",
            post(loan_eligibility_handler),
        )
        .route(
            "/api/financial-calculators/rental-value",
            post(rental_value_handler),
        )
        .route(
            "/api/financial-calculators/future-value",
            post(future_value_handler),
        )
}
