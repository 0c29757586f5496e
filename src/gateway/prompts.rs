//! Prompt assembly for the three gateway request shapes.

use chrono::NaiveDate;

use crate::derive::iso_date;
use crate::gateway::{ContextSnapshot, TripProposalRequest};

/// Persona and standing rules for the chat assistant.
pub const SYSTEM_PROMPT: &str = "\
You are 'GAIDE' (Dynamic, Context-Aware Travel Companion), an advanced AI \
operating system for travel. Your primary function is to serve as a \
real-time, personalized, and proactive travel agent.

CONTEXTUAL RULES:
1. Personal Preferences: filter every recommendation through the user's \
Travel DNA (dietary requirements, avoidances, style).
2. Ambiguity Filter: if a venue name is ambiguous (e.g. \"coffee shop\"), \
prioritize family safety and default to non-controversial interpretations.
3. Language Intelligence: identify the active language from the user's \
current location in the itinerary; when the itinerary crosses a language \
boundary, state the transition date explicitly.
4. Visa/Passport Logic: check traveler nationalities against destinations \
and flag required visas.
5. Alerts: proactively suggest avoiding activities during peak crowds or \
severe weather, using the injected weather data.
6. Checklist Audits: mark unconfirmed checklist items as PENDING \
CONFIRMATION when asked about departure readiness.

TONE: professional, reliable, highly proactive, succinct.";

/// Render the live application state into the system-instruction block.
pub fn context_block(context: &ContextSnapshot) -> String {
    let location_line = match &context.location {
        Some(point) => format!(
            "Status: ACTIVE. Coordinates: Lat {}, Lng {}. Use this for \"near me\" recommendations.",
            point.lat, point.lng
        ),
        None => "Status: UNKNOWN. If the user asks for nearby recommendations, ask them to enable location sharing.".to_string(),
    };

    let itinerary_location = context
        .itinerary
        .first()
        .map(|d| d.location.as_str())
        .unwrap_or("Unknown");
    let itinerary_date = context
        .itinerary
        .first()
        .map(|d| d.date.as_str())
        .unwrap_or("");
    let plan = serde_json::to_string(&context.itinerary).unwrap_or_else(|_| "[]".to_string());

    let party: Vec<String> = context
        .travelers
        .iter()
        .map(|t| format!("- {} ({})", t.name, t.nationality))
        .collect();

    let checklist: Vec<String> = context
        .checklist
        .iter()
        .map(|c| {
            format!(
                "- {}: {}",
                c.item,
                if c.is_confirmed { "CONFIRMED" } else { "PENDING" }
            )
        })
        .collect();

    format!(
        "{SYSTEM_PROMPT}\n\n\
         *** LIVE SYSTEM DATA ***\n\
         [REAL-TIME USER LOCATION]\n{location_line}\n\n\
         [CURRENT ITINERARY]\n\
         Location: {itinerary_location}\n\
         Date: {itinerary_date}\n\
         Full Plan: {plan}\n\n\
         [TRAVEL PARTY]\n{}\n\n\
         [USER PREFERENCES (Travel DNA)]\n\
         Dietary: {}\n\
         Avoid: {}\n\
         Style: {}\n\n\
         [CHECKLIST STATUS]\n{}",
        party.join("\n"),
        context.preferences.dietary.join(", "),
        context.preferences.custom_avoidances.join(", "),
        context.preferences.nightlife,
        checklist.join("\n"),
    )
}

/// Prompt for structured itinerary generation.
pub fn itinerary_prompt(request: &TripProposalRequest, start_date: NaiveDate) -> String {
    let prefs = &request.preferences;
    format!(
        "You are an expert travel planner. Generate a detailed {duration}-day travel itinerary for {destination}.\n\n\
         TRAVELER INFO: {party}\n\
         PREFERENCES:\n\
         - Vibe/Style: {style}\n\
         - Dietary Requirements: {dietary}\n\
         - Must Avoid: {avoid}\n\
         - Family Friendly: {family}\n\n\
         IMPORTANT RULES:\n\
         1. Each day MUST have 5-7 activities spread across Morning, Afternoon, and Evening\n\
         2. Include SPECIFIC venue names and addresses (not generic descriptions)\n\
         3. Include a mix of: iconic landmarks, hidden gems, local restaurants, cultural experiences\n\
         4. Activities should flow logically by location to minimize travel time\n\
         5. Respect all dietary and avoidance preferences strictly\n\
         6. Include estimated costs where applicable\n\n\
         GENERATE JSON with this EXACT structure:\n\
         {{\n\
           \"currency\": \"XXX\",\n\
           \"itinerary\": [\n\
             {{\n\
               \"day\": 1,\n\
               \"date\": \"{start}\",\n\
               \"location\": \"{destination}\",\n\
               \"language\": \"Local language name\",\n\
               \"outfit\": \"Weather-appropriate clothing suggestion\",\n\
               \"weather\": {{\"tempMax\": \"25°C\", \"tempMin\": \"18°C\", \"condition\": \"Sunny\", \"precipChance\": \"10%\", \"uvIndex\": \"5\"}},\n\
               \"activeAlerts\": [],\n\
               \"items\": [\n\
                 {{\"id\": \"unique-id-1\", \"time\": \"09:00\", \"activity\": \"Name of activity or place\", \"type\": \"dining|activity|transport|leisure\", \"location\": \"Specific address or area\", \"notes\": \"Brief helpful tip or detail\"}}\n\
               ]\n\
             }}\n\
           ]\n\
         }}\n\n\
         The currency is the local 3-letter ISO code. Dates are YYYY-MM-DD, incremented for each day.\n\
         Generate the complete {duration}-day itinerary now. Return ONLY valid JSON, no markdown or explanations.",
        duration = request.duration_days,
        destination = request.destination,
        party = request.party,
        style = if prefs.nightlife.is_empty() {
            "Balanced mix of activities"
        } else {
            &prefs.nightlife
        },
        dietary = if prefs.dietary.is_empty() {
            "None specified".to_string()
        } else {
            prefs.dietary.join(", ")
        },
        avoid = if prefs.custom_avoidances.is_empty() {
            "None specified".to_string()
        } else {
            prefs.custom_avoidances.join(", ")
        },
        family = if prefs.family_friendly { "Yes" } else { "No" },
        start = iso_date(start_date),
    )
}

/// Prompt for structured document-field extraction from an image.
pub const EXTRACTION_PROMPT: &str = "\
[TASK]
Analyze the uploaded travel document image and extract ALL available details.

[DOCUMENT TYPES TO DETECT]
1. ticket - Flight tickets, train tickets, bus tickets, boarding passes, e-tickets
2. visa - Travel visas, entry permits
3. insurance - Travel insurance documents
4. booking - Hotel bookings, accommodation confirmations
5. passport - Passports and national id documents

[OUTPUT FORMAT]
Return ONLY valid JSON with this structure:
{
  \"type\": \"ticket\" | \"visa\" | \"insurance\" | \"booking\" | \"passport\",
  \"name\": \"string\",
  \"docId\": \"string\",
  \"expiry\": \"DD-MM-YYYY\",
  \"airline\": \"string\",
  \"flightNumber\": \"string\",
  \"route\": \"XXX -> YYY\",
  \"departureTime\": \"14:30\",
  \"gate\": \"string\",
  \"terminal\": \"string\",
  \"seat\": \"string\",
  \"checkInUrl\": \"string\",
  \"passengerName\": \"string\"
}

[RULES]
1. For TICKETS: extract all visible flight details; name is \"[Airline] - [Passenger] - [Route]\"
2. For VISAS: extract visa number and validity dates
3. For INSURANCE: extract policy number and coverage dates
4. For BOOKINGS: extract confirmation number, hotel name, dates; expiry is the check-out date
5. Ticket-specific fields are only included when type is \"ticket\"
6. If any field is not visible, return an empty string for that field.";
