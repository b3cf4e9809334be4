//! System prompt and per-request context for handler generation.

use std::fmt::Write as _;

const PROMPT_HEADER: &str = r"You write Bloomreach Omniconnect transformation functions. Each function turns a webhook payload into Bloomreach Engagement events.

Rules:
1. Reply with ONE JavaScript function named 'handler' taking a single 'payload' argument, in a ```javascript code block
2. handler must return an array of event objects, even for a single event
3. Use const and let, never var
4. No third-party libraries and no console.log()
5. Include every utility function the handler calls

Event shapes:

Customer update:
{
    name: 'customers',
    command_id: 'unique-string-id',
    data: {
        customer_ids: { registered: 'customer@email.com' },   // required
        properties: { first_name: 'John', last_name: 'Doe' }, // attributes to update
        update_timestamp: 1614941503                          // unix seconds, required
    }
}

Customer event:
{
    name: 'customers/events',
    command_id: 'unique-string-id',
    data: {
        customer_ids: { registered: 'customer@email.com' },   // at least one id required
        event_type: 'purchase',                               // required
        timestamp: 1614941503,                                // unix seconds, required
        properties: { total_price: 1234.5 }                   // event attributes
    }
}
";

const PROMPT_HELPERS: &str = r"
Utility functions to include when timestamps are needed:
```javascript
function currentTimestampInSeconds() {
    return Math.round(Date.now() / 1000);
}

function parseDateToTimestampInSeconds(dateStr) {
    const date = new Date(dateStr);
    return Math.round(date.getTime() / 1000);
}
```

CSV input:
- payload is an array of row objects, one per CSV row
- iterate with payload.map() or payload.forEach(), or aggregate across rows
- extract customer_ids from every row

Always produce the complete handler with customer id extraction, fitting event types, correct timestamps, the requested field mappings and any conditional logic or additional events the user asks for.
";

/// System prompt listing the constants the handler may reference
pub fn system_prompt<'a>(constants: impl IntoIterator<Item = &'a str>) -> String {
    let mut prompt = PROMPT_HEADER.to_string();

    let names: Vec<&str> = constants.into_iter().collect();
    if !names.is_empty() {
        prompt.push_str("\nPredefined constants available to handler:\n");
        for name in names {
            let _ = writeln!(prompt, "- {name}");
        }
    }

    prompt.push_str(PROMPT_HELPERS);
    prompt
}

/// What the model is told about the sample payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleContext {
    /// The full JSON sample, as the user supplied it
    Json(String),
    /// Column names of a CSV sample
    Csv(Vec<String>),
}

/// User message for one round trip: sample description then instruction
pub fn context_message(sample: &SampleContext, instruction: &str) -> String {
    match sample {
        SampleContext::Json(json) => {
            format!("Here is the input JSON payload:\n{json}\n\nUser request: {instruction}")
        }
        SampleContext::Csv(headers) => format!(
            "Here is a CSV file with columns: {}\n\nThe payload will be an array where each element represents a row of the CSV.\n\nUser request: {instruction}",
            headers.join(", ")
        ),
    }
}
