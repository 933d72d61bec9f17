//! The `model_garden` resource
//!
//! One entity is one structured generation call: the prompt and response
//! schema go in, the model's JSON answer is stored as `response`.
//!
//! Create and Update run the whole pipeline (parse schema, translate, call,
//! validate) and only return state once every step succeeded. Read echoes
//! the stored state without calling the model. Delete has nothing to tear
//! down.

use declarative::{
    AttributeSchema, Diagnostic, Diagnostics, OpResult, OperationContext, PlanModifier, Resource,
    ResourceSchema,
};
use serde::{Deserialize, Serialize};
use vertexkit::{
    CallContext, Client, ClientOptions, Endpoint, GenerationRequest, StructuralSchema, translate,
};

/// Resource type name
pub const TYPE_NAME: &str = "model_garden";

/// Attribute values of one `model_garden` entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGarden {
    pub prompt: String,
    pub project_id: String,
    pub location: String,
    pub model_name: String,
    /// JSON text of the response schema, as configured
    pub response_schema: String,
    /// Model output; unknown until the entity is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ModelGarden {
    /// Build the request for this entity
    pub fn request(&self) -> Result<GenerationRequest, vertexkit::Error> {
        let raw = StructuralSchema::parse(&self.response_schema)?;
        Ok(GenerationRequest::new(
            self.prompt.as_str(),
            self.model_name.as_str(),
            Endpoint::new(self.project_id.as_str(), self.location.as_str()),
        )
        .with_response_schema(translate(Some(&raw))))
    }
}

/// Drives `model_garden` entities through the model client
pub struct ModelGardenResource {
    client: Client,
    options: ClientOptions,
}

impl ModelGardenResource {
    /// Create a resource talking to Vertex AI
    pub fn new(options: ClientOptions) -> Self {
        Self::with_client(Client::new(), options)
    }

    /// Create a resource with a custom client (useful for testing)
    pub fn with_client(client: Client, options: ClientOptions) -> Self {
        Self { client, options }
    }

    fn generate(&self, ctx: &OperationContext, planned: &ModelGarden) -> OpResult<ModelGarden> {
        let request = planned.request().map_err(diagnostics)?;

        let call = CallContext::new()
            .with_deadline(ctx.deadline())
            .with_cancel_flag(ctx.cancel_flag());
        let response = self
            .client
            .generate(&call, &request, &self.options)
            .map_err(diagnostics)?;

        log::trace!("Stored {} byte response", response.len());
        Ok(ModelGarden {
            response: Some(response),
            ..planned.clone()
        })
    }
}

fn diagnostics(err: vertexkit::Error) -> Diagnostics {
    let detail = format!("{err}\n{}", err.category().advice());
    let diagnostic = Diagnostic::error(err.title(), detail);
    match err {
        vertexkit::Error::SchemaParse(_) => diagnostic.for_attribute("response_schema").into(),
        _ => diagnostic.into(),
    }
}

impl Resource for ModelGardenResource {
    type Model = ModelGarden;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("Structured output from a Vertex AI model")
            .attribute(
                AttributeSchema::required("prompt")
                    .describe("The prompt to send to the model")
                    .with_modifier(PlanModifier::RequiresReplace),
            )
            .attribute(
                AttributeSchema::required("response_schema")
                    .describe("JSON schema the response must follow")
                    .with_modifier(PlanModifier::RequiresReplace),
            )
            .attribute(
                AttributeSchema::required("project_id")
                    .describe("Google Cloud project ID")
                    .with_modifier(PlanModifier::UseStateForUnknown),
            )
            .attribute(
                AttributeSchema::required("location")
                    .describe("Location of the Vertex AI endpoint")
                    .with_modifier(PlanModifier::UseStateForUnknown),
            )
            .attribute(
                AttributeSchema::required("model_name")
                    .describe("Name of the model to use")
                    .with_modifier(PlanModifier::UseStateForUnknown),
            )
            .attribute(
                AttributeSchema::computed("response")
                    .describe("Response from the model")
                    .with_modifier(PlanModifier::UseStateForUnknown),
            )
    }

    fn create(&self, ctx: &OperationContext, planned: &ModelGarden) -> OpResult<ModelGarden> {
        log::debug!("Creating model_garden with {}", planned.model_name);
        self.generate(ctx, planned)
    }

    fn read(&self, _ctx: &OperationContext, state: &ModelGarden) -> OpResult<ModelGarden> {
        Ok(state.clone())
    }

    fn update(
        &self,
        ctx: &OperationContext,
        planned: &ModelGarden,
        _prior: &ModelGarden,
    ) -> OpResult<ModelGarden> {
        log::debug!("Regenerating model_garden with {}", planned.model_name);
        self.generate(ctx, planned)
    }

    fn delete(&self, _ctx: &OperationContext, _state: &ModelGarden) -> OpResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Action, ExecuteOptions, ExecutionPlan, StateChange, execute_simple};
    use serde_json::Value;
    use std::collections::BTreeMap;
    use vertexkit::{MockBackend, Type};

    const FORECAST_SCHEMA: &str = r#"{"type":"object","properties":{"forecast":{"type":"array","items":{"type":"object","properties":{"Day":{"type":"string"}},"required":["Day"]}}},"required":["forecast"]}"#;

    const FORECAST: &str = r#"{"forecast":[{"Day":"Sunday"},{"Day":"Monday"}]}"#;

    fn planned(model_name: &str) -> ModelGarden {
        ModelGarden {
            prompt: "X".to_string(),
            project_id: "my-project".to_string(),
            location: "us-central1".to_string(),
            model_name: model_name.to_string(),
            response_schema: FORECAST_SCHEMA.to_string(),
            response: None,
        }
    }

    fn resource(mock: &MockBackend) -> ModelGardenResource {
        ModelGardenResource::with_client(
            Client::with_backend(Box::new(mock.clone())),
            ClientOptions::new(),
        )
    }

    fn ctx() -> OperationContext {
        OperationContext::new()
    }

    #[test]
    fn test_create_stores_first_part() {
        let mock = MockBackend::new();
        mock.push_text(FORECAST);

        let state = resource(&mock)
            .create(&ctx(), &planned("gemini-1.5-pro-002"))
            .unwrap();

        assert_eq!(state.response.as_deref(), Some(FORECAST));
        assert_eq!(state.model_name, "gemini-1.5-pro-002");
        assert_eq!(state.prompt, "X");
        assert_eq!(mock.call_count(), 1);

        let call = &mock.calls()[0];
        assert_eq!(call.model, "gemini-1.5-pro-002");
        let schema = call.request.generation_config.response_schema.as_ref().unwrap();
        assert_eq!(schema.kind, Type::Object);
        assert_eq!(schema.required, vec!["forecast"]);
        let items = schema.properties["forecast"].items.as_ref().unwrap();
        assert_eq!(items.properties["Day"].kind, Type::String);
    }

    #[test]
    fn test_create_with_truncated_schema_fails_before_calling() {
        let mock = MockBackend::new();
        mock.push_text(FORECAST);
        let mut bad = planned("gemini-1.5-pro-002");
        bad.response_schema = r#"{"type":"object","properties":{"#.to_string();

        let diags = resource(&mock).create(&ctx(), &bad).unwrap_err();

        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Invalid response schema");
        assert_eq!(diag.attribute.as_deref(), Some("response_schema"));
        assert!(diag.detail.contains("Check response_schema"));
        assert_eq!(mock.connections_opened(), 0);
    }

    #[test]
    fn test_create_empty_response() {
        let mock = MockBackend::new();
        mock.push_response(Default::default());

        let diags = resource(&mock)
            .create(&ctx(), &planned("gemini-1.5-pro-002"))
            .unwrap_err();
        assert_eq!(diags.iter().next().unwrap().summary, "Empty response");
    }

    #[test]
    fn test_create_client_failure() {
        let mock = MockBackend::new();
        mock.fail_connect("no credentials");

        let diags = resource(&mock)
            .create(&ctx(), &planned("gemini-1.5-pro-002"))
            .unwrap_err();
        assert_eq!(
            diags.iter().next().unwrap().summary,
            "Error creating Vertex AI client"
        );
    }

    #[test]
    fn test_create_generation_failure() {
        let mock = MockBackend::new();
        mock.push_failure("Publisher model not found", Some(404));

        let diags = resource(&mock)
            .create(&ctx(), &planned("gemini-0"))
            .unwrap_err();
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Error generating content");
        assert!(diag.detail.contains("Publisher model not found"));
        assert!(
            diag.detail
                .ends_with(vertexkit::ErrorCategory::Generation.advice())
        );
    }

    #[test]
    fn test_read_echoes_state_without_calling() {
        let mock = MockBackend::new();
        mock.push_text(FORECAST);
        let resource = resource(&mock);

        let created = resource.create(&ctx(), &planned("gemini-1.5-pro-002")).unwrap();
        let before = serde_json::to_string(&created).unwrap();
        let read = resource.read(&ctx(), &created).unwrap();

        assert_eq!(serde_json::to_string(&read).unwrap(), before);
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_update_regenerates_response() {
        let mock = MockBackend::new();
        mock.push_text(FORECAST);
        mock.push_text(r#"{"forecast":[]}"#);
        let resource = resource(&mock);

        let prior = resource.create(&ctx(), &planned("gemini-1.5-pro-002")).unwrap();
        let updated = resource
            .update(&ctx(), &planned("gemini-1.5-flash-002"), &prior)
            .unwrap();

        assert_eq!(updated.response.as_deref(), Some(r#"{"forecast":[]}"#));
        assert_eq!(updated.model_name, "gemini-1.5-flash-002");
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.calls()[1].model, "gemini-1.5-flash-002");
    }

    #[test]
    fn test_delete_is_noop() {
        let mock = MockBackend::new();
        let mut state = planned("gemini-1.5-pro-002");
        state.response = Some(FORECAST.to_string());

        resource(&mock).delete(&ctx(), &state).unwrap();
        assert_eq!(mock.connections_opened(), 0);
    }

    // Full plan/apply round trips through the declarative host

    fn config(model_name: &str, prompt: &str) -> BTreeMap<String, Value> {
        let mut configs = BTreeMap::new();
        configs.insert(
            "weather".to_string(),
            serde_json::json!({
                "prompt": prompt,
                "project_id": "my-project",
                "location": "us-central1",
                "model_name": model_name,
                "response_schema": FORECAST_SCHEMA,
            }),
        );
        configs
    }

    fn apply(
        resource: &ModelGardenResource,
        configs: &BTreeMap<String, Value>,
        states: &mut BTreeMap<String, Value>,
    ) -> ExecutionPlan {
        let plan = ExecutionPlan::build(&resource.schema(), TYPE_NAME, configs, states).unwrap();
        let report = execute_simple(resource, &plan, &ExecuteOptions::default()).unwrap();
        for outcome in report.outcomes {
            match outcome.state {
                StateChange::Set(value) => {
                    states.insert(outcome.address.name, value);
                }
                StateChange::Remove => {
                    states.remove(&outcome.address.name);
                }
                StateChange::Keep => {}
            }
        }
        plan
    }

    #[test]
    fn test_model_change_updates_in_place() {
        let mock = MockBackend::new();
        mock.push_text(FORECAST);
        mock.push_text(r#"{"forecast":[]}"#);
        let resource = resource(&mock);
        let mut states = BTreeMap::new();

        let plan = apply(&resource, &config("gemini-1.5-pro-002", "X"), &mut states);
        assert_eq!(plan.changes[0].action, Action::Create);
        assert_eq!(states["weather"]["response"], FORECAST);

        let plan = apply(&resource, &config("gemini-1.5-pro-002", "X"), &mut states);
        assert_eq!(plan.changes[0].action, Action::NoOp);
        assert_eq!(mock.call_count(), 1);

        let plan = apply(&resource, &config("gemini-1.5-flash-002", "X"), &mut states);
        assert_eq!(plan.changes[0].action, Action::Update);
        assert_eq!(states["weather"]["response"], r#"{"forecast":[]}"#);
        assert_eq!(states["weather"]["model_name"], "gemini-1.5-flash-002");
    }

    #[test]
    fn test_prompt_change_replaces() {
        let mock = MockBackend::new();
        mock.push_text(FORECAST);
        mock.push_text(FORECAST);
        let resource = resource(&mock);
        let mut states = BTreeMap::new();

        apply(&resource, &config("gemini-1.5-pro-002", "X"), &mut states);
        let plan = apply(&resource, &config("gemini-1.5-pro-002", "Y"), &mut states);

        assert_eq!(plan.changes[0].action, Action::Replace);
        assert_eq!(
            plan.changes[0].replace_reasons().collect::<Vec<_>>(),
            vec!["prompt"]
        );
        assert_eq!(states["weather"]["prompt"], "Y");
    }

    #[test]
    fn test_failed_create_commits_nothing() {
        let mock = MockBackend::new();
        let resource = resource(&mock);
        let mut configs = config("gemini-1.5-pro-002", "X");
        configs.get_mut("weather").unwrap()["response_schema"] = Value::from("{\"type\":");
        let mut states = BTreeMap::new();

        apply(&resource, &configs, &mut states);
        assert!(states.is_empty());
    }
}
