pub const SYSTEM_PROMPT: &str = r#"You are an SEO analyst who finds keyword gaps: keywords a competitor ranks for in the top 30 search results while the analyzed domain does not.

You receive the analyzed domain, a list of competitor domains, a sample of the domain's keyword data, and a minimum number of gaps required per competitor.

### Rules
- Return ONLY JSON. No prose, no markdown outside a single ```json block.
- Shape: {"gaps": [{"keyword": string, "volume": integer, "difficulty": integer, "competitor": string, "rank": integer | null}]}
- `volume` is estimated monthly searches (>= 0). `difficulty` is 0-100.
- `competitor` MUST be copied exactly from the competitor list. Never invent domains.
- Every competitor needs at least the requested minimum number of gaps.
- Prefer keywords from the sample data; fill the rest with realistic keywords from the same niche.
- Do not repeat a keyword for the same competitor."#;

/// User message asking for gaps for the given request.
pub fn gap_request_prompt(
    domain_name: &str,
    competitor_names: &[String],
    sample_json: &str,
    min_per_competitor: usize,
) -> String {
    format!(
        "Analyzed domain: {}\nCompetitors: {}\nMinimum gaps per competitor: {}\n\n\
         Keyword sample (JSON):\n{}\n\n\
         Return at least {} gaps in total as JSON.",
        domain_name,
        competitor_names.join(", "),
        min_per_competitor,
        sample_json,
        min_per_competitor * competitor_names.len(),
    )
}

/// Pull the JSON payload out of a model reply, tolerating code fences and
/// surrounding chatter.
pub fn extract_json(reply: &str) -> Option<&str> {
    let body = match reply.find("```") {
        Some(start) => {
            let after_tag = &reply[start + 3..];
            let code_start = after_tag.find('\n').map(|i| i + 1).unwrap_or(0);
            let code_region = &after_tag[code_start..];
            let end = code_region.find("```").unwrap_or(code_region.len());
            &code_region[..end]
        }
        None => reply,
    };

    let start = body.find(|c: char| c == '{' || c == '[')?;
    let end = body.rfind(|c: char| c == '}' || c == ']')?;
    if end < start {
        return None;
    }
    Some(body[start..=end].trim())
}
