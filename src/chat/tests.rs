use super::*;

#[test]
fn prompt_contains_context_question_and_refusal_instruction() {
    let prompt = build_prompt("Apple was founded in 1976.", "Who founded Apple?");

    assert!(prompt.contains("Apple was founded in 1976."));
    assert!(prompt.contains("Who founded Apple?"));
    assert!(prompt.contains(REFUSAL_ANSWER));
    assert!(prompt.ends_with("Answer:"));
}

#[test]
fn context_precedes_question() {
    let prompt = build_prompt("some context", "some question");

    let context_pos = prompt.find("some context").expect("context present");
    let question_pos = prompt.find("some question").expect("question present");
    assert!(context_pos < question_pos);
}
