use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::sync::Arc;
use log::info;

const EXTRACT_INGREDIENTS_PROMPT: &str = r#"You are a vision-language model tasked with reading the ingredient declaration on a product's packaging and outputting a JSON object with two parallel arrays: one for ingredient names and one for their amounts.

Instructions:
1. Identify each ingredient name as printed on the packaging.
2. Capture the corresponding amount (weight, volume, percentage, etc.) exactly as shown.
3. Amounts must be a number followed by a unit (e.g., 12%, 100g, 0.5L). Do not include parentheses, special characters, or textual descriptions (e.g., (12%) becomes 12%). If an ingredient has no amount listed, use an empty string for that entry in the amounts array.
4. Ignore any text that is not part of the ingredient list.
5. Determine the language used in the ingredient declaration and report it in English under "language" (e.g., "Vietnamese", "French", "Japanese").

Return ONLY a JSON object in the exact format below, with no extra text.
{
  "ingredients": ["Ingredient1", "Ingredient2", "..."],
  "amounts": ["Amount1", "Amount2", "..."],
  "language": "Language"
}

Example input: "Ingredients: Eau 85%, Glycérine 10%, Parfum"
Expected output:
{
  "ingredients": ["Eau", "Glycérine", "Parfum"],
  "amounts": ["85%", "10%", ""],
  "language": "French"
}"#;

const EXTRACT_OTHER_INFO_PROMPT: &str = r#"You are a vision-language model tasked with extracting key product information from packaging, excluding the ingredient list.

Instructions:
1. Extract the following if available: product name, brand, net content (e.g., 500g, 250ml, 1L), manufacturing date, expiry or best-before date, country of origin, manufacturer, usage instructions (short), storage instructions, nutritional information or typical values (only if clearly structured).
2. Omit the ingredient list entirely.
3. Dates must follow the format YYYY-MM-DD. If a date is not clearly structured, return it as written.
4. Preserve units for content and nutritional values exactly as written (e.g., kcal, g, mg).
5. If a field is not present or legible, use an empty string.

Return ONLY a JSON object with the fields product_name, brand, net_content, manufacturing_date, expiry_date, country_of_origin, manufacturer, usage_instructions, storage_instructions and nutritional_info (an object of nutrient name to value)."#;

const EXTRACT_USER_PROMPT: &str = "Extract the information from the image.";

const TRANSLATE_PROMPT: &str = r#"You are a helpful translator.

Translate the JSON dictionary you are given into {language}.
Instructions:
- Translate ALL keys, values, and any nested objects or arrays into {language}.
- Do NOT modify the structure; only translate human-readable strings.
- Keys may contain spaces; keep that format.
- If a value is a dictionary or list, recursively translate all keys and strings inside it.
- Return a valid JSON object with only the translated dictionary, no extra text.

Example (target language Vietnamese):
Input: {"greeting": "Hello", "details": {"user name": "Alice", "hobbies": ["Reading", "Cooking"]}}
Output: {"lời chào": "Xin chào", "chi tiết": {"tên người dùng": "Alice", "sở thích": ["Đọc sách", "Nấu ăn"]}}"#;

const TRANSLATE_USER_PROMPT: &str = "Translate the following JSON dictionary into {language}.\nInput: {info}";

const CHAT_SYSTEM_PROMPT: &str = r#"You are an AI assistant that answers user questions using both prior conversation and structured data extracted from a product's packaging image.

Here is the context extracted from the packaging:
{product_information}

This context may include:
- Product name, ingredients, usage instructions, benefits
- Nutritional information, warnings, dosage (if applicable)
- Manufacturer info, expiry date, certifications, etc.

Your job is to:
- Use this information to generate accurate, relevant, and helpful responses
- Maintain a natural, conversational tone based on the chat history
- If the user asks something unrelated to the context, answer appropriately using general knowledge
- If required information is missing or unclear in the packaging data, respond gracefully or ask for clarification

Always respond in the same language as the user's input (Vietnamese or English)."#;

const CHAT_USER_PROMPT: &str = "Previous conversation:\n{history}\n\nUser: {message}\n\nAssistant:";

const CHAT_NAME_PROMPT: &str = r#"Generate a short, descriptive name (max 5 words) for a chat based on this conversation:
User: {user_message}
Bot: {bot_message}
Product context: {product_information}
The name should reflect the main topic or purpose of this conversation. Reply with the name only."#;

/// Prompt templates. `{placeholder}` markers are filled by [`render`].
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub extract_ingredients: String,
    pub extract_other_info: String,
    pub extract_user: String,
    pub translate_system: String,
    pub translate_user: String,
    pub chat_system: String,
    pub chat_user: String,
    pub chat_name: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            extract_ingredients: EXTRACT_INGREDIENTS_PROMPT.to_string(),
            extract_other_info: EXTRACT_OTHER_INFO_PROMPT.to_string(),
            extract_user: EXTRACT_USER_PROMPT.to_string(),
            translate_system: TRANSLATE_PROMPT.to_string(),
            translate_user: TRANSLATE_USER_PROMPT.to_string(),
            chat_system: CHAT_SYSTEM_PROMPT.to_string(),
            chat_user: CHAT_USER_PROMPT.to_string(),
            chat_name: CHAT_NAME_PROMPT.to_string(),
        }
    }
}

/// Loads prompt overrides from a JSON file. Templates missing from the file keep their defaults.
pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, Box<dyn Error + Send + Sync>> {
    let Some(path) = path.filter(|p| !p.trim().is_empty()) else {
        info!("Using built-in prompt templates");
        return Ok(Arc::new(PromptConfig::default()));
    };

    let file_content = fs
        ::read_to_string(path)
        .map_err(|e| format!("Failed to read prompts file '{}': {}", path, e))?;
    let config: PromptConfig = serde_json
        ::from_str(&file_content)
        .map_err(|e| format!("Failed to parse prompts file '{}': {}", path, e))?;
    info!("Loaded prompt templates from {}", path);
    Ok(Arc::new(config))
}

/// Substitutes each `{key}` in `template` in a single pass, so substituted values are never
/// rescanned. Other braces are left untouched.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = values.iter().find(|(key, _)| {
            tail.len() > key.len() + 1
                && tail[1..].starts_with(key)
                && tail[1 + key.len()..].starts_with('}')
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_only_named_placeholders() {
        let out = render("Translate into {language}: {\"a\": 1} {missing}", &[("language", "French")]);
        assert_eq!(out, "Translate into French: {\"a\": 1} {missing}");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = render("{history}\nUser: {message}", &[
            ("history", "user: what is {message}?"),
            ("message", "hi"),
        ]);
        assert_eq!(out, "user: what is {message}?\nUser: hi");
    }

    #[test]
    fn missing_path_uses_defaults() {
        let prompts = load_prompts(None).unwrap();
        assert!(prompts.chat_system.contains("{product_information}"));
        assert!(prompts.translate_system.contains("{language}"));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let path = std::env::temp_dir().join(format!("prompts-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"{ "chat_name": "Name it: {user_message}" }"#).unwrap();

        let prompts = load_prompts(path.to_str()).unwrap();
        assert_eq!(prompts.chat_name, "Name it: {user_message}");
        assert_eq!(prompts.extract_user, EXTRACT_USER_PROMPT);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(load_prompts(Some("/definitely/not/here.json")).is_err());
    }
}
