/// Builds the system message for an answer-generation call: a fixed
/// professional preamble plus the retrieval context, when present.
pub fn build_system_prompt(context: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("你是一位专业的法律咨询AI助手，具有丰富的法律知识和司法实践经验。");
    prompt.push_str("你的任务是回答用户的法律问题，提供准确、专业、易懂的法律建议。");
    prompt.push_str("\n\n");
    prompt.push_str("回答要求：");
    prompt.push_str("1. 回答要准确、专业，基于中国法律法规");
    prompt.push_str("2. 语言要通俗易懂，避免过于专业的术语");
    prompt.push_str("3. 如果涉及具体法条，要明确指出法条名称和条号");
    prompt.push_str("4. 如果是案例分析，要提供相关案例参考");
    prompt.push_str("5. 如果问题不够明确，要主动询问以获取更多信息");
    prompt.push_str("\n\n");

    if !context.is_empty() {
        prompt.push_str("相关知识上下文：\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    prompt.push_str("请根据以上要求回答用户的问题。");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_context() {
        let prompt = build_system_prompt("相关法条：\n民法典第577条：……\n\n");
        assert!(prompt.contains("相关知识上下文"));
        assert!(prompt.contains("民法典第577条"));
    }

    #[test]
    fn test_prompt_without_context_omits_heading() {
        let prompt = build_system_prompt("");
        assert!(!prompt.contains("相关知识上下文"));
        assert!(prompt.contains("法律咨询AI助手"));
    }
}
