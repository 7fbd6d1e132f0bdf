//! Instruction headers sent ahead of the page content

/// Marks the end of the instructions and the start of the page
const PAGE_SEPARATOR: &str = "\n\n--------\n\n";

/// Appended after the page content
const PROMPT_SUFFIX: &str = "\n\nBegin. ";

const RESPONSE_RULES: &str = r#"Response instructions:
- Begin your response with a chain_of_thought tag. In it, explain how the HTML is structured and how you will parse it. Then reason step by step about the pagination of the whole site: map out every pagination hierarchy you can see (letters, numbered pages, sections), list every candidate for the next page you considered and why you picked one. The goal is to collect the whole site from start to end, not only the current slice, so only decide there is no next page when you are certain.
- The next_page tag must hold the full absolute URL of the next page, or null if there is none.
- Wrap the final JSON object in a <json></json> tag. The whole response must be structured exactly like:
```
<response>
    <chain_of_thought>...</chain_of_thought>
    <next_page>...</next_page>
    <json>[json object here]</json>
</response>
```

IMPORTANT:
- Do NOT write code. Read the page and construct the JSON object yourself.
- The page may use an unfamiliar writing system or character set. Reproduce every character exactly, without loss, corruption or modification."#;

/// Instructions for dictionary pages
///
/// The expected payload maps each headword to its translations and example
/// sentences in every target language.
pub fn dictionary_instructions(source_language: &str, target_languages: &[String]) -> String {
    let targets = target_languages.join(", ");
    format!(
        r#"You will be given the HTML of a web page containing a dictionary of the language "{source}", with target languages "{targets}".

Read the HTML carefully, work out its structure, and build a JSON object holding the dictionary contents of the page, shaped like this:
```
{{
    "corpus": {{
        "word_in_{source}": {{
            "translations": {{
                "target_language_1": "definition of the word in target_language_1",
                "target_language_n": "definition of the word in target_language_n"
            }},
            "example_sentences": [{{
                "{source}": "example sentence in {source}",
                "target_language_1": "example sentence in target_language_1",
                "target_language_n": "example sentence in target_language_n"
            }}]
        }}
    }}
}}
```

Include EVERY word on the page, every target language for every word (use null when the page gives no translation), and every example sentence containing the word.

Constraints:
    Language:
        - {source}
    Target language(s):
        - {targets}

{rules}{separator}"#,
        source = source_language,
        targets = targets,
        rules = RESPONSE_RULES,
        separator = PAGE_SEPARATOR,
    )
}

/// Instructions for raw content pages
///
/// The expected payload is a flat list of sentences.
pub fn raw_content_instructions(source_language: &str) -> String {
    format!(
        r#"You will be given the HTML of a web page with content in the language "{source}".

Read the HTML carefully, work out its structure, and build a JSON object holding the text of the page, shaped like this:
```
{{
    "corpus": [
        "sentence1",
        "sentence2"
    ]
}}
```

Include EVERY sentence on the page.

Constraints:
    Language:
        - {source}

{rules}{separator}"#,
        source = source_language,
        rules = RESPONSE_RULES,
        separator = PAGE_SEPARATOR,
    )
}

/// Builds the full request content for one page
///
/// Dictionary instructions are used when target languages are given,
/// raw content instructions otherwise.
pub fn build_prompt(
    page_text: &str,
    source_language: &str,
    target_languages: Option<&[String]>,
) -> String {
    let header = match target_languages {
        Some(targets) if !targets.is_empty() => dictionary_instructions(source_language, targets),
        _ => raw_content_instructions(source_language),
    };

    let mut prompt = String::with_capacity(header.len() + page_text.len() + PROMPT_SUFFIX.len());
    prompt.push_str(&header);
    prompt.push_str(page_text);
    prompt.push_str(PROMPT_SUFFIX);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_prompt_when_targets_present() {
        let targets = vec!["English".to_string(), "Malay".to_string()];
        let prompt = build_prompt("<html>page</html>", "Rungus", Some(&targets));

        assert!(prompt.contains("dictionary of the language \"Rungus\""));
        assert!(prompt.contains("target languages \"English, Malay\""));
        assert!(prompt.contains("\"translations\""));
        assert!(prompt.contains("\"example_sentences\""));
    }

    #[test]
    fn test_raw_prompt_without_targets() {
        let prompt = build_prompt("<html>page</html>", "Rungus", None);

        assert!(prompt.contains("content in the language \"Rungus\""));
        assert!(!prompt.contains("\"translations\""));
        assert!(prompt.contains("\"sentence1\""));
    }

    #[test]
    fn test_empty_targets_mean_raw_mode() {
        let prompt = build_prompt("x", "Rungus", Some(&[]));
        assert!(prompt.contains("content in the language"));
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("<p>body</p>", "Iban", None);

        assert!(prompt.ends_with("\n--------\n\n<p>body</p>\n\nBegin. "));
        assert!(prompt.contains("<next_page>...</next_page>"));
        assert!(prompt.contains("<json>[json object here]</json>"));
    }

    #[test]
    fn test_braces_rendered_literally() {
        let prompt = raw_content_instructions("Iban");
        assert!(prompt.contains("{\n    \"corpus\": ["));
        assert!(!prompt.contains("{{"));
    }
}
