mod common;

use std::sync::Arc;

use polisense_rag::{
    build_messages, describe_employee, fill_system_prompt, format_policy_context, Assistant,
    EmployeeRecord, GenerationConfig, Message, RagError, Role, NO_POLICY_FOUND,
};

use common::{index_of, MockLlm, Reply, POLICY_CHUNKS};

fn generation() -> GenerationConfig {
    GenerationConfig::new("llama-3.1-8b-instant", 0.3)
}

#[test]
fn question_for_ada_sends_one_request_with_name_and_policy() {
    let llm = MockLlm::answering(vec!["You get ", "twenty days."]);
    let assistant = Assistant::new(
        Some(EmployeeRecord::named("Ada")),
        Arc::new(index_of("policies.pdf", POLICY_CHUNKS)),
        llm.clone(),
        4,
    );

    let fragments: Vec<String> = assistant
        .get_response(&[], "What is the vacation policy?", &generation())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(fragments.concat(), "You get twenty days.");

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    let (messages, sent) = &requests[0];
    assert_eq!(sent, &generation());
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("Name: Ada"));
    assert!(messages[0].content.contains(POLICY_CHUNKS[0]));
    assert_eq!(messages[1], Message::user("What is the vacation policy?"));
}

#[test]
fn get_response_leaves_history_untouched() {
    let llm = MockLlm::answering(vec!["ok"]);
    let assistant = Assistant::new(None, Arc::new(index_of("p.pdf", POLICY_CHUNKS)), llm.clone(), 2);
    let history = vec![
        Message::user("Do I need a badge?"),
        Message::assistant("Yes, at all times."),
    ];
    let before = history.clone();

    let stream = assistant.get_response(&history, "And visitors?", &generation()).unwrap();
    assert_eq!(stream.count(), 1);

    assert_eq!(history, before);
    let (messages, _) = &llm.requests()[0];
    assert_eq!(&messages[1..3], &before[..]);
    assert_eq!(messages[3].content, "And visitors?");
}

#[test]
fn request_failure_surfaces_as_generation_error() {
    let llm = MockLlm::new(Reply::RequestFails("connection reset"));
    let assistant = Assistant::new(None, Arc::new(index_of("p.pdf", POLICY_CHUNKS)), llm, 4);

    let err = assistant
        .get_response(&[], "vacation?", &generation())
        .err()
        .expect("request fails");
    assert!(matches!(err, RagError::Generation(_)));
}

#[test]
fn with_index_keeps_employee_and_client() {
    let llm = MockLlm::answering(vec!["ok"]);
    let assistant = Assistant::new(
        Some(EmployeeRecord::named("Ada")),
        Arc::new(index_of("old.pdf", POLICY_CHUNKS)),
        llm.clone(),
        4,
    );
    let swapped = assistant.with_index(Arc::new(index_of("new.pdf", &["Remote work is allowed two days a week."])));

    assert_eq!(swapped.index().source_name(), "new.pdf");
    assert_eq!(swapped.employee(), Some(&EmployeeRecord::named("Ada")));
    swapped.get_response(&[], "remote work", &generation()).unwrap().for_each(drop);
    assert_eq!(llm.requests().len(), 1);
    assert!(llm.requests()[0].0[0].content.contains("Remote work is allowed"));
}

#[test]
fn employee_description_and_template_filling() {
    assert_eq!(describe_employee(None), "unknown");
    assert_eq!(describe_employee(Some(&EmployeeRecord::default())), "unknown");
    let full = EmployeeRecord {
        name: Some("Ada".to_string()),
        role: Some("Engineer".to_string()),
        department: Some("IT".to_string()),
    };
    assert_eq!(describe_employee(Some(&full)), "Name: Ada, Role: Engineer, Department: IT");

    let filled = fill_system_prompt("Name: Ada", "Badges are mandatory.");
    assert!(filled.contains("- **Employee Information**: Name: Ada"));
    assert!(filled.contains("- **Retrieved Policy Information**: Badges are mandatory."));
    assert!(!filled.contains("{employee_information}"));
    assert!(!filled.contains("{retrieved_policy_information}"));
}

#[test]
fn placeholder_text_in_values_is_left_literal() {
    let filled = fill_system_prompt(
        "Name: {retrieved_policy_information}",
        "Quote: {employee_information}",
    );
    assert!(filled.contains("- **Employee Information**: Name: {retrieved_policy_information}"));
    assert!(filled.contains("- **Retrieved Policy Information**: Quote: {employee_information}"));
}

#[test]
fn empty_retrieval_is_stated_in_the_prompt() {
    assert_eq!(format_policy_context(&[]), NO_POLICY_FOUND);
    let messages = build_messages(None, &[], &[Message::system("stale")], "hello");
    assert_eq!(messages.len(), 2);
    assert!(messages[0].content.contains(NO_POLICY_FOUND));
    assert!(messages[0].content.contains("**Employee Information**: unknown"));
}
