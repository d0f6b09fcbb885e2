//! Client-side tools and the loop that runs them.
//!
//! When a reply stops with `tool_use`, the caller runs each requested tool and answers with a
//! user message of `tool_result` blocks; [`run_tool_loop`] repeats that until the model
//! produces a final answer.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::client::Backend;
use crate::observability::{TOOL_CALLS, TOOL_ERRORS};
use crate::render::Renderer;
use crate::{
    ContentBlock, Error, MessageCreateParams, MessageParam, MessageResponse, MessageRole, Result,
    StopReason, ToolParam, ToolResultBlock, ToolUseBlock, Usage,
};

/// Default bound on tool rounds in one [`run_tool_loop`].
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/////////////////////////////////////////////// Tool ///////////////////////////////////////////////

/// A function the model may call.
pub trait Tool: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    /// What the tool does, shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the input object.
    fn input_schema(&self) -> Value;

    /// Run the tool.  `Err` carries a message reported back to the model as a failed result.
    fn call(&self, input: &Value) -> std::result::Result<Value, String>;

    /// Converts the tool to a parameter format for the API.
    fn to_param(&self) -> ToolParam {
        ToolParam::new(self.name(), self.input_schema()).with_description(self.description())
    }
}

////////////////////////////////////////////// ToolBox /////////////////////////////////////////////

/// The tools offered in a request.
#[derive(Default)]
pub struct ToolBox {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolBox {
    /// An empty toolbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in `get_weather` and `calculate` tools.
    pub fn builtin() -> Self {
        Self::new().with_tool(GetWeather).with_tool(Calculate)
    }

    /// Adds a tool.  A later tool with the same name shadows an earlier one.
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(Box::new(tool));
        self
    }

    /// Looks up a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| tool.as_ref())
    }

    /// Wire descriptions of every tool.
    pub fn params(&self) -> Vec<ToolParam> {
        self.tools.iter().map(|tool| tool.to_param()).collect()
    }

    /// Runs the tool a block asks for and wraps the outcome as a `tool_result`.
    ///
    /// Unknown tools and tool failures become error results carrying a JSON `error` payload.
    pub fn dispatch(&self, tool_use: &ToolUseBlock) -> ToolResultBlock {
        TOOL_CALLS.click();
        let outcome = match self.get(&tool_use.name) {
            Some(tool) => tool.call(&tool_use.input),
            None => Err(format!("Unknown tool: {}", tool_use.name)),
        };
        match outcome {
            Ok(value) => ToolResultBlock::new(&tool_use.id, value.to_string()),
            Err(message) => {
                TOOL_ERRORS.click();
                ToolResultBlock::error(&tool_use.id, json!({ "error": message }).to_string())
            }
        }
    }
}

//////////////////////////////////////////// GetWeather ////////////////////////////////////////////

/// Simulated weather lookup.  Always sunny.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetWeather;

impl Tool for GetWeather {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city and country, e.g., 'London, UK'"
                },
                "unit": {
                    "type": "string",
                    "enum": ["celsius", "fahrenheit"],
                    "description": "Temperature unit"
                }
            },
            "required": ["location"]
        })
    }

    fn call(&self, input: &Value) -> std::result::Result<Value, String> {
        let location = input
            .get("location")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing required string field 'location'".to_string())?;
        let unit = match input.get("unit") {
            None | Some(Value::Null) => "celsius",
            Some(Value::String(unit)) if unit == "celsius" || unit == "fahrenheit" => unit.as_str(),
            Some(other) => return Err(format!("unsupported unit: {other}")),
        };
        let temperature = if unit == "fahrenheit" { 72 } else { 22 };
        Ok(json!({
            "location": location,
            "temperature": temperature,
            "unit": unit,
            "condition": "sunny",
            "humidity": 45
        }))
    }
}

///////////////////////////////////////////// Calculate ////////////////////////////////////////////

/// Arithmetic over `+ - * / % **`, unary minus, and parentheses.  Input is parsed, never
/// executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculate;

impl Tool for Calculate {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Perform a mathematical calculation (supports +, -, *, /, **, %)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The math expression to evaluate, e.g., '2 + 2 * 3'"
                }
            },
            "required": ["expression"]
        })
    }

    fn call(&self, input: &Value) -> std::result::Result<Value, String> {
        let expression = input
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing required string field 'expression'".to_string())?;
        let result = evaluate(expression)?;
        Ok(json!({ "expression": expression, "result": number(result) }))
    }
}

// Integral results print without a fractional part.
fn number(value: f64) -> Value {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < EXACT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Evaluate an arithmetic expression.
///
/// Precedence from loosest to tightest: `+ -`, then `* / %`, then unary minus, then `**`
/// (right associative, so `-2 ** 2` is `-4` and `2 ** 3 ** 2` is `512`).  `%` takes the sign
/// of the divisor.
pub fn evaluate(expression: &str) -> std::result::Result<f64, String> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(format!("unexpected {}", tokens[parser.pos]));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "number {n}"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::Pow => write!(f, "'**'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
        }
    }
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => {
                if chars.next_if(|&(_, c)| c == '*').is_some() {
                    Token::Pow
                } else {
                    Token::Star
                }
            }
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some((idx, c)) =
                    chars.next_if(|&(_, c)| c.is_ascii_digit() || c == '.' || c == '_')
                {
                    end = idx + c.len_utf8();
                }
                let literal = input[start..end].replace('_', "");
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number: {}", &input[start..end]))?;
                Token::Num(value)
            }
            c => return Err(format!("unsupported character: {c:?}")),
        };
        tokens.push(token);
    }
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    Ok(tokens)
}

const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus {
                value + rhs
            } else {
                value - rhs
            };
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                Token::Slash if rhs == 0.0 => return Err("division by zero".to_string()),
                Token::Slash => value / rhs,
                _ if rhs == 0.0 => return Err("modulo by zero".to_string()),
                _ => value - rhs * (value / rhs).floor(),
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> std::result::Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.nested(Self::unary)?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> std::result::Result<f64, String> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            let exponent = self.nested(Self::unary)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> std::result::Result<f64, String> {
        match self.advance() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(token) => Err(format!("expected ')', found {token}")),
                    None => Err("expected ')'".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected {token}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn nested(
        &mut self,
        f: fn(&mut Self) -> std::result::Result<f64, String>,
    ) -> std::result::Result<f64, String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err("expression is nested too deeply".to_string());
        }
        let value = f(self);
        self.depth -= 1;
        value
    }
}

//////////////////////////////////////////// Tool loop /////////////////////////////////////////////

/// Something that can send a complete request.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send one non-streaming request.
    async fn send_message(&self, params: MessageCreateParams) -> Result<MessageResponse>;
}

#[async_trait]
impl MessageSender for Backend {
    async fn send_message(&self, params: MessageCreateParams) -> Result<MessageResponse> {
        self.send(params).await
    }
}

/// What a finished tool loop produced.
#[derive(Debug, Clone)]
pub struct ToolLoopOutcome {
    /// The final response, whose stop reason is not `tool_use`.
    pub response: MessageResponse,
    /// The conversation as sent in the last request, plus nothing of the final response.
    pub messages: Vec<MessageParam>,
    /// Number of tool rounds run.
    pub rounds: usize,
    /// Usage summed over every request.
    pub usage: Usage,
}

/// Sends `params` with the toolbox attached and answers tool requests until the model stops
/// asking, or until `max_rounds` rounds have run.
pub async fn run_tool_loop(
    sender: &dyn MessageSender,
    params: MessageCreateParams,
    toolbox: &ToolBox,
    renderer: &mut dyn Renderer,
    max_rounds: usize,
) -> Result<ToolLoopOutcome> {
    let mut params = params.with_tools(toolbox.params()).with_stream(false);
    let mut response = sender.send_message(params.clone()).await?;
    let mut usage = response.usage;
    let mut rounds = 0;
    renderer.print_info(&format!(
        "Initial response - Stop reason: {}",
        describe(response.stop_reason)
    ));

    while response.stop_reason == Some(StopReason::ToolUse) {
        if rounds >= max_rounds {
            return Err(Error::invalid_response(
                format!("model still requesting tools after {max_rounds} rounds"),
                None,
            ));
        }
        rounds += 1;

        let mut results = Vec::new();
        for tool_use in response.content.iter().filter_map(ContentBlock::as_tool_use) {
            renderer.print_tool_call(&tool_use.name, &tool_use.input);
            let result = toolbox.dispatch(tool_use);
            renderer.print_tool_result(
                &tool_use.name,
                &result.content,
                result.is_error.unwrap_or(false),
            );
            results.push(ContentBlock::from(result));
        }
        if results.is_empty() {
            return Err(Error::invalid_response(
                "stop reason tool_use without any tool_use blocks",
                None,
            ));
        }

        params.messages.push(MessageParam::with_blocks(
            std::mem::take(&mut response.content),
            MessageRole::Assistant,
        ));
        params
            .messages
            .push(MessageParam::with_blocks(results, MessageRole::User));
        response = sender.send_message(params.clone()).await?;
        usage = usage + response.usage;
    }

    Ok(ToolLoopOutcome {
        response,
        messages: params.messages,
        rounds,
        usage,
    })
}

fn describe(stop_reason: Option<StopReason>) -> &'static str {
    stop_reason.map(|r| r.as_str()).unwrap_or("unknown")
}
