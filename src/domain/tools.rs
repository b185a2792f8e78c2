//! User management tools exposed via Model Context Protocol
//!
//! Each tool decodes its already validated arguments, delegates to the `UserService`
//! backend and renders the outcome as text. Backend failures surface as execution errors.

use std::sync::Arc;

use async_trait::async_trait;
use rust_mcp_sdk::{macros, schema::Tool};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::{
    models::{UserCreate, UserSearchRequest, UserUpdate},
    utils::{format_search_results, format_user},
};
use crate::mcp::registry::{ExecutionError, RegistryError, ToolDescriptor, ToolHandler, ToolRegistry};
use crate::user_client::UserService;

#[macros::mcp_tool(
    name = "get_user_by_id",
    description = "Provides full user information by user id"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetUserByIdTool {
    pub id: i64,
}

#[macros::mcp_tool(
    name = "search_users",
    description = "Searches users by name, surname, email and gender"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SearchUsersTool {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
}

#[macros::mcp_tool(name = "delete_users", description = "Deletes a user by id")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct DeleteUserTool {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateUserArguments {
    id: i64,
    new_info: UserUpdate,
}

impl From<SearchUsersTool> for UserSearchRequest {
    fn from(tool: SearchUsersTool) -> Self {
        Self {
            name: tool.name,
            surname: tool.surname,
            email: tool.email,
            gender: tool.gender,
        }
    }
}

pub const ADD_USER_DESCRIPTION: &str = "Adds a new user to the user management service";
pub const UPDATE_USER_DESCRIPTION: &str = "Updates an existing user's information";

/// Registers the user tools in discovery order.
pub fn register_user_tools(
    registry: &mut ToolRegistry,
    users: Arc<dyn UserService>,
) -> Result<(), RegistryError> {
    registry.register(descriptor(
        GetUserByIdTool::tool(),
        Arc::new(GetUserById(users.clone())),
    ))?;
    registry.register(descriptor(
        SearchUsersTool::tool(),
        Arc::new(SearchUsers(users.clone())),
    ))?;
    registry.register(ToolDescriptor::new(
        "add_user",
        ADD_USER_DESCRIPTION,
        add_user_schema(),
        Arc::new(AddUser(users.clone())),
    ))?;
    registry.register(ToolDescriptor::new(
        "update_user",
        UPDATE_USER_DESCRIPTION,
        update_user_schema(),
        Arc::new(UpdateUser(users.clone())),
    ))?;
    registry.register(descriptor(DeleteUserTool::tool(), Arc::new(DeleteUser(users))))?;
    Ok(())
}

fn descriptor(tool: Tool, handler: Arc<dyn ToolHandler>) -> ToolDescriptor {
    ToolDescriptor::new(
        tool.name,
        tool.description.unwrap_or_default(),
        json!(tool.input_schema),
        handler,
    )
}

fn decode_arguments<T: DeserializeOwned>(arguments: Map<String, Value>) -> Result<T, ExecutionError> {
    serde_json::from_value(Value::Object(arguments))
        .map_err(|err| ExecutionError::invalid_arguments(err.to_string()))
}

struct GetUserById(Arc<dyn UserService>);

#[async_trait]
impl ToolHandler for GetUserById {
    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ExecutionError> {
        let GetUserByIdTool { id } = decode_arguments(arguments)?;
        let user = self
            .0
            .get_user(id)
            .await
            .map_err(|err| ExecutionError::new(err.to_string()))?;
        Ok(format_user(&user))
    }
}

struct SearchUsers(Arc<dyn UserService>);

#[async_trait]
impl ToolHandler for SearchUsers {
    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ExecutionError> {
        let request: UserSearchRequest = decode_arguments::<SearchUsersTool>(arguments)?.into();
        let users = self
            .0
            .search_users(&request)
            .await
            .map_err(|err| ExecutionError::new(err.to_string()))?;
        Ok(format_search_results(&users))
    }
}

struct AddUser(Arc<dyn UserService>);

#[async_trait]
impl ToolHandler for AddUser {
    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ExecutionError> {
        let user: UserCreate = decode_arguments(arguments)?;
        let body = self
            .0
            .add_user(&user)
            .await
            .map_err(|err| ExecutionError::new(err.to_string()))?;
        Ok(format!("User successfully added: {body}"))
    }
}

struct UpdateUser(Arc<dyn UserService>);

#[async_trait]
impl ToolHandler for UpdateUser {
    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ExecutionError> {
        let UpdateUserArguments { id, new_info } = decode_arguments(arguments)?;
        let body = self
            .0
            .update_user(id, &new_info)
            .await
            .map_err(|err| ExecutionError::new(err.to_string()))?;
        Ok(format!("User successfully updated: {body}"))
    }
}

struct DeleteUser(Arc<dyn UserService>);

#[async_trait]
impl ToolHandler for DeleteUser {
    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ExecutionError> {
        let DeleteUserTool { id } = decode_arguments(arguments)?;
        self.0
            .delete_user(id)
            .await
            .map_err(|err| ExecutionError::new(err.to_string()))?;
        Ok("User successfully deleted".to_string())
    }
}

// Nested objects are spelled out by hand.
fn address_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "country": {"type": "string"},
            "city": {"type": "string"},
            "street": {"type": "string"},
            "flat_house": {"type": "string"}
        },
        "required": ["country", "city", "street", "flat_house"]
    })
}

fn credit_card_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "num": {"type": "string"},
            "cvv": {"type": "string"},
            "exp_date": {"type": "string"}
        },
        "required": ["num", "cvv", "exp_date"]
    })
}

fn user_properties(nullable: bool) -> Value {
    let text = if nullable {
        json!({"type": ["string", "null"]})
    } else {
        json!({"type": "string"})
    };
    let optional_text = json!({"type": ["string", "null"]});
    let mut address = address_schema();
    let mut credit_card = credit_card_schema();
    for schema in [&mut address, &mut credit_card] {
        schema["type"] = json!(["object", "null"]);
    }

    json!({
        "name": text,
        "surname": text,
        "email": text,
        "phone": optional_text,
        "date_of_birth": optional_text,
        "address": address,
        "gender": optional_text,
        "company": optional_text,
        "salary": {"type": ["number", "null"]},
        "about_me": text,
        "credit_card": credit_card
    })
}

pub fn add_user_schema() -> Value {
    json!({
        "type": "object",
        "properties": user_properties(false),
        "required": ["name", "surname", "email", "about_me"]
    })
}

pub fn update_user_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "new_info": {
                "type": "object",
                "properties": user_properties(true)
            }
        },
        "required": ["id", "new_info"]
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::mcp::schema;
    use crate::user_client::{BackendError, UserRecord};

    #[derive(Default)]
    struct MockUserService {
        users: Vec<UserRecord>,
        calls: Mutex<Vec<String>>,
    }

    impl MockUserService {
        fn with_users(users: Vec<Value>) -> Self {
            Self {
                users: users
                    .into_iter()
                    .filter_map(|user| match user {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().expect("calls lock").push(call);
        }

        fn find(&self, id: i64) -> Result<UserRecord, BackendError> {
            self.users
                .iter()
                .find(|user| user.get("id").and_then(Value::as_i64) == Some(id))
                .cloned()
                .ok_or(BackendError::Http {
                    status: 404,
                    body: format!("User {id} not found"),
                })
        }
    }

    #[async_trait]
    impl UserService for MockUserService {
        async fn get_user(&self, id: i64) -> Result<UserRecord, BackendError> {
            self.record(format!("get {id}"));
            self.find(id)
        }

        async fn search_users(
            &self,
            request: &UserSearchRequest,
        ) -> Result<Vec<UserRecord>, BackendError> {
            self.record(format!("search {:?}", request.query_pairs()));
            Ok(self
                .users
                .iter()
                .filter(|user| match request.name.as_deref() {
                    Some(name) => user.get("name").and_then(Value::as_str) == Some(name),
                    None => true,
                })
                .cloned()
                .collect())
        }

        async fn add_user(&self, user: &UserCreate) -> Result<String, BackendError> {
            self.record(format!("add {}", user.email));
            Ok(json!({"id": 42}).to_string())
        }

        async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<String, BackendError> {
            self.record(format!("update {id} {:?}", update.company));
            self.find(id).map(|user| Value::Object(user).to_string())
        }

        async fn delete_user(&self, id: i64) -> Result<(), BackendError> {
            self.record(format!("delete {id}"));
            self.find(id).map(|_| ())
        }
    }

    fn registry_with(service: Arc<MockUserService>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register_user_tools(&mut registry, service).expect("register tools");
        registry
    }

    fn arguments(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("arguments must be an object"),
        }
    }

    async fn run(registry: &ToolRegistry, name: &str, value: Value) -> Result<String, ExecutionError> {
        let tool = registry.lookup(name).expect("tool registered");
        tool.handler.execute(arguments(value)).await
    }

    #[test]
    fn registers_tools_in_discovery_order() {
        let registry = registry_with(Arc::new(MockUserService::default()));
        let names: Vec<&str> = registry.list().iter().map(|tool| tool.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["get_user_by_id", "search_users", "add_user", "update_user", "delete_users"]
        );
    }

    #[test]
    fn registering_twice_reports_duplicate() {
        let service = Arc::new(MockUserService::default());
        let mut registry = registry_with(service.clone());

        let error = register_user_tools(&mut registry, service).expect_err("duplicate");
        assert_eq!(error, RegistryError::DuplicateTool("get_user_by_id".to_string()));
    }

    #[test]
    fn get_user_schema_requires_id() {
        let registry = registry_with(Arc::new(MockUserService::default()));
        let tool = registry.lookup("get_user_by_id").expect("tool");

        assert_eq!(tool.input_schema["type"], "object");
        assert!(tool.input_schema["required"]
            .as_array()
            .is_some_and(|required| required.contains(&json!("id"))));
        assert!(schema::validate(&tool.input_schema, &json!({})).is_err());
    }

    #[test]
    fn add_user_schema_accepts_full_payload_and_rejects_partial() {
        let full = json!({
            "name": "Jane",
            "surname": "Doe",
            "email": "jane@example.com",
            "about_me": "Writes Rust",
            "salary": 5200.5,
            "address": {"country": "USA", "city": "Austin", "street": "Main 1", "flat_house": "5"},
            "credit_card": {"num": "4111", "cvv": "123", "exp_date": "01/30"}
        });
        assert!(schema::validate(&add_user_schema(), &full).is_ok());

        let error = schema::validate(&add_user_schema(), &json!({"name": "Jane"}))
            .expect_err("missing fields");
        assert!(error.message.contains("missing required field"));
    }

    #[test]
    fn update_user_schema_allows_sparse_new_info() {
        let sparse = json!({"id": 3, "new_info": {"company": "Acme", "address": null}});
        assert!(schema::validate(&update_user_schema(), &sparse).is_ok());
        assert!(schema::validate(&update_user_schema(), &json!({"id": 3})).is_err());
    }

    #[test]
    fn search_schema_accepts_null_for_optional_filters() {
        let registry = registry_with(Arc::new(MockUserService::default()));
        let tool = registry.lookup("search_users").expect("tool");

        assert!(schema::validate(&tool.input_schema, &json!({"name": null})).is_ok());
        assert!(schema::validate(&tool.input_schema, &json!({"name": 7})).is_err());
    }

    #[test]
    fn id_schemas_refuse_values_outside_i64() {
        let registry = registry_with(Arc::new(MockUserService::default()));
        for name in ["get_user_by_id", "delete_users"] {
            let tool = registry.lookup(name).expect("tool");
            assert!(schema::validate(&tool.input_schema, &json!({"id": 3.0})).is_err(), "{name}");
            assert!(
                schema::validate(&tool.input_schema, &json!({"id": u64::MAX})).is_err(),
                "{name}"
            );
        }
    }

    #[tokio::test]
    async fn undecodable_arguments_are_not_execution_failures() {
        let service = Arc::new(MockUserService::default());
        let registry = registry_with(service.clone());

        let error = run(&registry, "get_user_by_id", json!({"id": "one"}))
            .await
            .expect_err("bad id");

        assert!(matches!(error, ExecutionError::InvalidArguments(_)));
        assert!(service.calls.lock().expect("calls").is_empty());
    }

    #[tokio::test]
    async fn search_treats_null_filters_as_absent() {
        let service = Arc::new(MockUserService::default());
        let registry = registry_with(service.clone());

        run(&registry, "search_users", json!({"name": null, "gender": "female"}))
            .await
            .expect("search succeeds");

        assert_eq!(
            service.calls.lock().expect("calls").as_slice(),
            ["search [(\"gender\", \"female\")]".to_string()]
        );
    }

    #[tokio::test]
    async fn get_user_formats_record() {
        let service = Arc::new(MockUserService::with_users(vec![
            json!({"id": 1, "name": "John", "surname": "Smith"}),
        ]));
        let registry = registry_with(service);

        let text = run(&registry, "get_user_by_id", json!({"id": 1}))
            .await
            .expect("user found");

        assert!(text.contains("  name: John\n"));
        assert!(text.contains("  surname: Smith\n"));
    }

    #[tokio::test]
    async fn get_user_surfaces_backend_status() {
        let registry = registry_with(Arc::new(MockUserService::default()));

        let error = run(&registry, "get_user_by_id", json!({"id": 9}))
            .await
            .expect_err("missing user");

        assert_eq!(error.to_string(), "HTTP 404: User 9 not found");
    }

    #[tokio::test]
    async fn search_without_matches_is_plain_text() {
        let service = Arc::new(MockUserService::with_users(vec![
            json!({"id": 1, "name": "Jane"}),
        ]));
        let registry = registry_with(service.clone());

        let text = run(&registry, "search_users", json!({"name": "John"}))
            .await
            .expect("search succeeds");

        assert_eq!(text, "No users found matching the search criteria");
        assert_eq!(
            service.calls.lock().expect("calls").as_slice(),
            ["search [(\"name\", \"John\")]".to_string()]
        );
    }

    #[tokio::test]
    async fn search_lists_matches() {
        let service = Arc::new(MockUserService::with_users(vec![
            json!({"id": 1, "name": "John"}),
            json!({"id": 2, "name": "John"}),
        ]));
        let registry = registry_with(service);

        let text = run(&registry, "search_users", json!({"name": "John"}))
            .await
            .expect("search succeeds");

        assert!(text.starts_with("Found 2 user(s):"));
    }

    #[tokio::test]
    async fn add_user_reports_created_body() {
        let service = Arc::new(MockUserService::default());
        let registry = registry_with(service.clone());

        let text = run(
            &registry,
            "add_user",
            json!({
                "name": "Jane",
                "surname": "Doe",
                "email": "jane@example.com",
                "about_me": "Writes Rust"
            }),
        )
        .await
        .expect("created");

        assert_eq!(text, "User successfully added: {\"id\":42}");
        assert_eq!(
            service.calls.lock().expect("calls").as_slice(),
            ["add jane@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn update_user_passes_new_info() {
        let service = Arc::new(MockUserService::with_users(vec![json!({"id": 3, "name": "Ann"})]));
        let registry = registry_with(service.clone());

        let text = run(
            &registry,
            "update_user",
            json!({"id": 3, "new_info": {"company": "Acme"}}),
        )
        .await
        .expect("updated");

        assert!(text.starts_with("User successfully updated: "));
        assert_eq!(
            service.calls.lock().expect("calls").as_slice(),
            ["update 3 Some(\"Acme\")".to_string()]
        );
    }

    #[tokio::test]
    async fn delete_user_confirms() {
        let service = Arc::new(MockUserService::with_users(vec![json!({"id": 5})]));
        let registry = registry_with(service);

        let text = run(&registry, "delete_users", json!({"id": 5}))
            .await
            .expect("deleted");
        assert_eq!(text, "User successfully deleted");

        let error = run(&registry, "delete_users", json!({"id": 6}))
            .await
            .expect_err("unknown user");
        assert!(error.to_string().starts_with("HTTP 404"));
    }
}
