use hookshaper_engine::{
    Category, InputKind, Pipeline, PipelineError, Provenance, Stage, normalize,
};
use indexmap::IndexMap;
use serde_json::json;
use serial_test::serial;

fn pipeline() -> Pipeline {
    Pipeline::new(IndexMap::from([
        ("INTEGRATION_ID".to_string(), json!("test-integration")),
        ("COMPANY_ID".to_string(), json!("test-company")),
        ("INTEGRATION_NAME".to_string(), json!("Test Integration")),
    ]))
}

const TWO_EVENT_RESPONSE: &str = r#"Sure! This handler emits a profile update and a registration event.

```javascript
function currentTimestampInSeconds() {
    return Math.round(Date.now() / 1000);
}

function handler(payload) {
    const event_list = [];
    const customerIDs = { registered: payload.email };

    event_list.push({
        name: "customers",
        command_id: String(payload.email + "-update"),
        data: {
            customer_ids: customerIDs,
            properties: { first_name: payload.first_name },
            update_timestamp: currentTimestampInSeconds()
        }
    });

    event_list.push({
        name: "customers/events",
        command_id: String(payload.email + "-event"),
        data: {
            customer_ids: customerIDs,
            event_type: "registration",
            timestamp: currentTimestampInSeconds(),
            properties: { source: INTEGRATION_NAME }
        }
    });

    return event_list;
}
```

Let me know if you need more fields."#;

#[serial]
#[test]
fn test_two_event_scenario() {
    let input = normalize(r#"{"email":"a@x.com","first_name":"A"}"#, InputKind::Json).unwrap();
    let preview = pipeline()
        .run_response(TWO_EVENT_RESPONSE, &input)
        .expect("pipeline should succeed");

    assert_eq!(preview.source.provenance(), Provenance::FencedBlock);
    assert_eq!(preview.injected_helpers, vec!["parseDateToTimestampInSeconds"]);
    assert_eq!(preview.events.len(), 2);

    assert_eq!(preview.events[0]["name"], json!("customers"));
    assert_eq!(preview.events[1]["name"], json!("customers/events"));
    for event in &preview.events {
        assert_eq!(event["data"]["customer_ids"]["registered"], json!("a@x.com"));
    }
    assert_eq!(
        preview.events[1]["data"]["properties"]["source"],
        json!("Test Integration")
    );
}

#[serial]
#[test]
fn test_prose_response_is_extraction_failure() {
    let input = normalize("{}", InputKind::Json).unwrap();
    let err = pipeline()
        .run_response("I need more details about your payload.", &input)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Extraction(_)));
    assert_eq!(err.report().category, Category::CodeExtraction);
    assert_eq!(err.diagnostic().map(|d| d.stage), Some(Stage::Extraction));
}

#[serial]
#[test]
fn test_syntax_error_is_materialization_failure() {
    let input = normalize("{}", InputKind::Json).unwrap();
    let response = "```javascript\nfunction handler(payload) {\n  return [;\n}\n```";
    let err = pipeline().run_response(response, &input).unwrap_err();

    assert_eq!(err.report().category, Category::CodeMaterialization);
    assert_eq!(
        err.diagnostic().map(|d| d.stage),
        Some(Stage::Materialization)
    );
}

#[serial]
#[test]
fn test_wrong_shape_is_schema_validation() {
    let input = normalize("{}", InputKind::Json).unwrap();
    let response = "function handler(payload) {\n  return { name: \"customers\", data: {} };\n}";
    let err = pipeline().run_response(response, &input).unwrap_err();

    assert_eq!(err.report().category, Category::SchemaValidation);
    assert_eq!(err.diagnostic().map(|d| d.stage), Some(Stage::Validation));
}

#[serial]
#[test]
fn test_runtime_error_is_execution_failure() {
    let input = normalize("{}", InputKind::Json).unwrap();
    let response = "```\nfunction handler(payload) {\n  return payload.customer.email;\n}\n```";
    let mut pipeline = pipeline();
    let err = pipeline.run_response(response, &input).unwrap_err();

    assert_eq!(err.report().category, Category::ExecutionFailure);
    assert_eq!(
        pipeline.engine().state(),
        hookshaper_engine::EngineState::Idle
    );
}

#[serial]
#[test]
fn test_csv_rows_end_to_end() {
    let input = normalize(
        "email,first_name,plan\na@x.com,A,pro\n,,\nb@x.com,B,free\n",
        InputKind::Csv,
    )
    .unwrap();
    let response = r#"```javascript
function handler(payload) {
    return payload.map((row) => ({
        name: "customers",
        command_id: `${COMPANY_ID}-${row.email}`,
        data: {
            customer_ids: { registered: row.email },
            properties: { first_name: row.first_name, plan: row.plan },
            update_timestamp: currentTimestampInSeconds()
        }
    }));
}
```"#;

    let preview = pipeline().run_response(response, &input).unwrap();
    assert_eq!(preview.events.len(), 2);
    assert_eq!(preview.events[0]["command_id"], json!("test-company-a@x.com"));
    assert_eq!(preview.events[1]["data"]["properties"]["plan"], json!("free"));
}
