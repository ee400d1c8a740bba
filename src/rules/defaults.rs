use super::model::RuleDefinition;

/// Small built-in rule set used when no rule file is configured or the file is unusable.
pub fn default_rule_definitions() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::new("tuition_inquiry", 1.4)
            .with_keywords(["học phí", "tuition", "phí", "tiền", "cost", "chi phí"])
            .with_patterns([r"học phí.*(?:bao nhiêu|giá)", r"tuition.*(?:fee|cost)"])
            .with_description("Basic tuition inquiry rule"),
        RuleDefinition::new("campus_info", 1.2)
            .with_keywords(["campus", "cơ sở", "thư viện", "library", "ký túc xá"])
            .with_patterns([
                r"(?:campus|cơ sở).*(?:ở đâu|where)",
                r"thư viện.*(?:giờ|hours)",
            ])
            .with_description("Basic campus information rule"),
        RuleDefinition::new("program_information", 1.1)
            .with_keywords(["ngành", "program", "major", "cntt", "it", "ai"])
            .with_patterns([r"ngành.*(?:nào|gì)", r"(?:program|major).*(?:available|có)"])
            .with_description("Basic program information rule"),
        RuleDefinition::new("admission_requirements", 1.3)
            .with_keywords(["điểm chuẩn", "admission", "requirements", "yêu cầu", "đầu vào"])
            .with_patterns([
                r"điểm chuẩn.*(?:bao nhiêu|2024|2025)",
                r"(?:yêu cầu|requirements).*(?:đầu vào|admission)",
            ])
            .with_description("Basic admission requirements rule"),
    ]
}
