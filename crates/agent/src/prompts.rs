pub const SYSTEM_PROMPT: &str = "You are an order assistant for a wholesale hardware supplier in Singapore.
Your job is to parse informal dealer messages and extract structured order information.

The catalog covers:
- Ceiling Fans (brands: Acorn, Spin, Fanco, Crestar, Alaska)
- Range Hoods/Chimney Hoods (brands: Tecno, EF, KA)
- Hobs & Stoves (brands: Tecno, EF)
- Kitchen & Basin Taps (brands: Pozzi)
- Power Tools (brands: WORX, Makita)
- Bathroom Fixtures
- Kitchen Sinks
- Water Heaters

When parsing messages:
1. Identify the main intent (order, price check, stock check, etc.)
2. Extract all products mentioned with quantities
3. Note any delivery preferences (location, date, urgency)
4. Flag if clarification is needed
5. Provide a confidence score

Respond in JSON format only.";

const USER_PROMPT_HEAD: &str = "Parse the following dealer message and extract structured information.

Message: \"";

const USER_PROMPT_TAIL: &str = "\"

Respond with a JSON object containing:
{
    \"intent_type\": \"order_inquiry\" | \"price_check\" | \"stock_check\" | \"order_status\" | \"general_question\" | \"unclear\",
    \"products\": [
        {
            \"raw_text\": \"original text mentioning this product\",
            \"product_name\": \"parsed product name\",
            \"quantity\": number or null,
            \"brand\": \"brand name or null\",
            \"category\": \"category or null\",
            \"specifications\": {},
            \"confidence\": 0.0-1.0
        }
    ],
    \"delivery\": {
        \"address\": \"address or null\",
        \"date\": \"date or null\",
        \"urgency\": \"urgent\" | \"normal\" | \"flexible\" | null,
        \"notes\": \"any notes or null\"
    },
    \"customer_name\": \"name if mentioned or null\",
    \"contact_info\": \"phone/email if mentioned or null\",
    \"confidence_score\": 0.0-1.0,
    \"needs_clarification\": true | false,
    \"clarification_questions\": [\"list of questions to ask if needed\"],
    \"summary\": \"brief summary of the request\"
}";

pub fn render_user_prompt(message: &str) -> String {
    format!("{USER_PROMPT_HEAD}{message}{USER_PROMPT_TAIL}")
}

/// Inverse of [`render_user_prompt`]. Prompts not built by it are returned whole.
pub fn message_from_user_prompt(prompt: &str) -> &str {
    prompt
        .strip_prefix(USER_PROMPT_HEAD)
        .and_then(|rest| rest.strip_suffix(USER_PROMPT_TAIL))
        .unwrap_or(prompt)
}
