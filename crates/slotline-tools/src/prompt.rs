/// A named prompt template offered to the client.
///
/// Templates are static text; the client decides when to insert them into
/// its conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: String,
    pub description: String,
    pub text: String,
}

impl PromptTemplate {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            text: text.into(),
        }
    }
}
