//! Built-in prompt templates.

/// System instruction for the query rewriter.
pub const REPHRASE_SYSTEM: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question.";

/// Final human turn for the query rewriter.
pub const REPHRASE_HUMAN: &str = "Rephrase the following question as a standalone question:\n{{question}}";

/// Persona for answer generation. When retrieval finds nothing the model
/// answers from this instruction alone.
pub const ANSWER_SYSTEM: &str = "You are an interviewee, expert at coding and analyzing.\n\
Using the provided resume, answer questions for the interviewer \
to the best of your ability using only the resources provided.\n\
Be verbose!";

/// Final human turn for answer generation.
pub const ANSWER_HUMAN: &str = "<context>\n{{context}}</context>\n\
Now, answer this question using the above context and chat history:\n\
{{standalone_question}}";
