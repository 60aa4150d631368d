use rmcp::model::{JsonObject, Tool};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const CONFIGURE_API_KEYS: &str = "configure_api_keys";
pub const CREATE_SPOT_ORDER: &str = "create_spot_order";
pub const CANCEL_ORDER: &str = "cancel_order";
pub const GET_BALANCES: &str = "get_balances";
pub const GET_OPEN_ORDERS: &str = "get_open_orders";

/// Declarative description of a callable tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema for the tool's arguments.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Names listed under `required` in the input schema.
    pub fn required(&self) -> Vec<&str> {
        self.input_schema["required"]
            .as_array()
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// The descriptor as an MCP tool listing entry.
    pub fn to_tool(&self) -> Tool {
        let schema = match &self.input_schema {
            Value::Object(map) => map.clone(),
            _ => JsonObject::new(),
        };
        Tool::new(self.name, self.description, Arc::new(schema))
    }
}

pub fn configure_api_keys_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: CONFIGURE_API_KEYS,
        description: "Configure Binance API keys for trading",
        input_schema: json!({
            "type": "object",
            "properties": {
                "apiKey": { "type": "string", "description": "Binance API key" },
                "apiSecret": { "type": "string", "description": "Binance API secret" }
            },
            "required": ["apiKey", "apiSecret"]
        }),
    }
}

pub fn create_spot_order_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: CREATE_SPOT_ORDER,
        description: "Create a new spot order on Binance",
        input_schema: json!({
            "type": "object",
            "properties": {
                "symbol": { "type": "string", "description": "Trading pair symbol (e.g., BTCUSDT)" },
                "side": { "type": "string", "enum": ["BUY", "SELL"], "description": "Order side" },
                "type": { "type": "string", "enum": ["LIMIT", "MARKET"], "description": "Order type" },
                "quantity": { "type": "string", "description": "Order quantity" },
                "price": { "type": "string", "description": "Order price (required for LIMIT orders)" },
                "timeInForce": { "type": "string", "enum": ["GTC", "IOC", "FOK"], "description": "Time in force" }
            },
            "required": ["symbol", "side", "type", "quantity"]
        }),
    }
}

pub fn cancel_order_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: CANCEL_ORDER,
        description: "Cancel an existing order",
        input_schema: json!({
            "type": "object",
            "properties": {
                "symbol": { "type": "string", "description": "Trading pair symbol (e.g., BTCUSDT)" },
                "orderId": { "type": "number", "description": "Order ID to cancel" }
            },
            "required": ["symbol", "orderId"]
        }),
    }
}

pub fn get_balances_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: GET_BALANCES,
        description: "Get account balances",
        input_schema: json!({
            "type": "object",
            "properties": {},
            "required": []
        }),
    }
}

pub fn get_open_orders_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: GET_OPEN_ORDERS,
        description: "Get open orders",
        input_schema: json!({
            "type": "object",
            "properties": {
                "symbol": { "type": "string", "description": "Trading pair symbol (optional)" }
            },
            "required": []
        }),
    }
}

/// Every tool, in listing order.
pub fn all_tools() -> Vec<ToolDescriptor> {
    vec![
        configure_api_keys_tool(),
        create_spot_order_tool(),
        cancel_order_tool(),
        get_balances_tool(),
        get_open_orders_tool(),
    ]
}

pub fn find_tool(name: &str) -> Option<ToolDescriptor> {
    all_tools().into_iter().find(|tool| tool.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_uniquely_named_tools() {
        let mut names: Vec<_> = all_tools().iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
        assert!(find_tool(GET_OPEN_ORDERS).is_some());
        assert!(find_tool("withdraw").is_none());
    }

    #[test]
    fn test_create_order_schema() {
        let tool = create_spot_order_tool();
        assert_eq!(tool.required(), vec!["symbol", "side", "type", "quantity"]);
        assert_eq!(
            tool.input_schema["properties"]["timeInForce"]["enum"],
            json!(["GTC", "IOC", "FOK"])
        );
        assert_eq!(
            tool.input_schema["properties"]["side"]["enum"],
            json!(["BUY", "SELL"])
        );
    }

    #[test]
    fn test_descriptor_serializes_input_schema_camel_case() {
        let value = serde_json::to_value(cancel_order_tool()).unwrap();
        assert_eq!(value["name"], "cancel_order");
        assert_eq!(value["inputSchema"]["required"], json!(["symbol", "orderId"]));
        assert!(get_balances_tool().required().is_empty());
    }

    #[test]
    fn test_mcp_tool_keeps_name_description_and_schema() {
        let descriptor = get_open_orders_tool();
        let tool = descriptor.to_tool();
        let value = serde_json::to_value(&tool).unwrap();

        assert_eq!(value["name"], "get_open_orders");
        assert_eq!(value["description"], "Get open orders");
        assert_eq!(value["inputSchema"], descriptor.input_schema);
    }
}
