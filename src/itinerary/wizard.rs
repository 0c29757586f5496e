//! New-trip wizard state.
//!
//! Four steps; the form reconciles start date, end date, and duration in
//! whichever direction the user edits. Generation runs on the last step. A
//! generation failure keeps the wizard on that step so the caller can offer
//! a retry, never a half-advanced state.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::derive::iso_date;
use crate::error::AppError;
use crate::gateway::{AiGateway, TripProposal, TripProposalRequest};
use crate::itinerary::empty_itinerary;
use crate::model::UserPreferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Destination,
    Dates,
    Party,
    Review,
}

impl WizardStep {
    fn next(self) -> Self {
        match self {
            WizardStep::Destination => WizardStep::Dates,
            WizardStep::Dates => WizardStep::Party,
            WizardStep::Party => WizardStep::Review,
            WizardStep::Review => WizardStep::Review,
        }
    }

    fn previous(self) -> Self {
        match self {
            WizardStep::Destination => WizardStep::Destination,
            WizardStep::Dates => WizardStep::Destination,
            WizardStep::Party => WizardStep::Dates,
            WizardStep::Review => WizardStep::Party,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TripForm {
    pub destination: String,
    /// `YYYY-MM-DD`; empty until chosen. Malformed input is kept as-is.
    pub start_date: String,
    pub end_date: String,
    pub duration: u32,
    pub adults: u32,
    pub infants: u32,
    pub ai_generated: bool,
}

impl Default for TripForm {
    fn default() -> Self {
        Self {
            destination: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            duration: 3,
            adults: 1,
            infants: 0,
            ai_generated: false,
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

impl TripForm {
    /// Start changed: keep the duration, move the end date.
    pub fn set_start_date(&mut self, value: &str) {
        self.start_date = value.to_string();
        if let Some(start) = parse_date(value) {
            self.end_date = iso_date(start + chrono::Duration::days(self.duration as i64));
        }
    }

    /// Duration changed: keep the start, move the end date.
    pub fn set_duration(&mut self, days: u32) {
        self.duration = days.max(1);
        if let Some(start) = parse_date(&self.start_date) {
            self.end_date = iso_date(start + chrono::Duration::days(self.duration as i64));
        }
    }

    /// End changed: recompute the duration from the span.
    pub fn set_end_date(&mut self, value: &str) {
        self.end_date = value.to_string();
        let (Some(start), Some(end)) = (parse_date(&self.start_date), parse_date(value)) else {
            return;
        };
        self.duration = (end - start).num_days().unsigned_abs().max(1) as u32;
    }

    pub fn party_label(&self) -> String {
        format!("{} Adults, {} Children", self.adults, self.infants)
    }

    fn start_or_today(&self) -> NaiveDate {
        parse_date(&self.start_date).unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

pub struct TripWizard {
    step: WizardStep,
    pub form: TripForm,
    preferences: UserPreferences,
    generating: bool,
}

impl TripWizard {
    pub fn new(preferences: UserPreferences) -> Self {
        Self {
            step: WizardStep::Destination,
            form: TripForm::default(),
            preferences,
            generating: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn back(&mut self) {
        self.step = self.step.previous();
    }

    /// Advance one step; on the final step, generate the itinerary instead.
    ///
    /// `Ok(None)` means the wizard moved forward (or a generation is already
    /// running); `Ok(Some(_))` carries the finished proposal. An error leaves
    /// the wizard on the review step so the caller can retry.
    pub async fn advance(
        &mut self,
        gateway: &dyn AiGateway,
    ) -> Result<Option<TripProposal>, AppError> {
        if self.step != WizardStep::Review {
            self.step = self.step.next();
            return Ok(None);
        }
        if self.generating {
            return Ok(None);
        }

        self.generating = true;
        let result = self.generate(gateway).await;
        self.generating = false;

        match result {
            Ok(proposal) => {
                info!(days = proposal.itinerary.len(), "trip proposal ready");
                Ok(Some(proposal))
            }
            Err(e) => {
                warn!(error = %e, "trip generation failed; staying on review step");
                Err(e)
            }
        }
    }

    async fn generate(&self, gateway: &dyn AiGateway) -> Result<TripProposal, AppError> {
        if self.form.ai_generated {
            let request = TripProposalRequest {
                destination: self.form.destination.clone(),
                duration_days: self.form.duration,
                party: self.form.party_label(),
                preferences: self.preferences.clone(),
            };
            return gateway.generate_itinerary(&request).await.map_err(Into::into);
        }

        // Non-AI path: a blank skeleton the user fills in later.
        Ok(TripProposal {
            currency: "USD".to_string(),
            itinerary: empty_itinerary(
                &self.form.destination,
                self.form.start_or_today(),
                self.form.duration,
            ),
        })
    }
}
