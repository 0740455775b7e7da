//! Diet Planner MCP Server Implementation
//!
//! Implements the MCP server with all Diet Planner tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{
    DayPlanCreate, DayPlanUpdate, LooseProductCreate, LooseProductUpdate, MealCreate,
    MealItemInput, MealUpdate, ProductCreate, ProductUpdate, SlotAssignment,
};
use crate::nutrition::MealSlot;
use crate::tools::calculator;
use crate::tools::categories;
use crate::tools::day_plans;
use crate::tools::meals;
use crate::tools::products;
use crate::tools::status::StatusTracker;

/// Diet Planner MCP Service
#[derive(Clone)]
pub struct DietPlanService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    tool_router: ToolRouter<DietPlanService>,
}

impl DietPlanService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(entity: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        entity, id
    ))]))
}

// ============================================================================
// Category Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddCategoryParams {
    /// Category name (e.g., "Protein", "Vegetables")
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateCategoryParams {
    /// Category ID
    pub id: i64,
    /// New name
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteCategoryParams {
    /// Category ID (products in it become uncategorized)
    pub id: i64,
}

// ============================================================================
// Product Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddProductParams {
    pub name: String,
    /// Category ID (see list_categories)
    pub category_id: Option<i64>,
    /// Calories (kcal) per 100g
    #[serde(default)]
    pub calories_per_100: f64,
    /// Protein (g) per 100g
    #[serde(default)]
    pub protein_per_100: f64,
    /// Carbohydrates (g) per 100g
    #[serde(default)]
    pub carbs_per_100: f64,
    /// Fat (g) per 100g
    #[serde(default)]
    pub fat_per_100: f64,
    pub sugar_per_100: Option<f64>,
    pub fiber_per_100: Option<f64>,
    pub salt_per_100: Option<f64>,
    /// Typical package or piece weight in grams (display only)
    pub reference_weight: Option<f64>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetProductParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListProductsParams {
    /// Name search (substring)
    pub query: Option<String>,
    /// Category name filter
    pub category: Option<String>,
    /// Sort by: name (default), calories, protein
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_sort_by() -> String { "name".to_string() }
fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateProductParams {
    pub id: i64,
    pub name: Option<String>,
    pub category_id: Option<i64>,
    /// Remove the product from its category (ignored when category_id is given)
    #[serde(default)]
    pub clear_category: bool,
    pub calories_per_100: Option<f64>,
    pub protein_per_100: Option<f64>,
    pub carbs_per_100: Option<f64>,
    pub fat_per_100: Option<f64>,
    pub sugar_per_100: Option<f64>,
    pub fiber_per_100: Option<f64>,
    pub salt_per_100: Option<f64>,
    pub reference_weight: Option<f64>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteProductParams {
    pub id: i64,
}

// ============================================================================
// Meal Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealItemParam {
    pub product_id: i64,
    /// Grams (missing or 0 means 100)
    pub weight: Option<f64>,
}

impl From<MealItemParam> for MealItemInput {
    fn from(p: MealItemParam) -> Self {
        MealItemInput { product_id: p.product_id, weight: p.weight }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateMealParams {
    pub name: String,
    /// Preparation notes
    pub recipe: Option<String>,
    #[serde(default)]
    pub items: Vec<MealItemParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetMealParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMealsParams {
    /// Name search (substring)
    pub query: Option<String>,
    /// Sort by: name (default), calories, protein
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateMealParams {
    pub id: i64,
    pub name: Option<String>,
    pub recipe: Option<String>,
    /// Replaces every line item when given
    pub items: Option<Vec<MealItemParam>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteMealParams {
    /// Meal ID (day plan slots holding it become empty)
    pub id: i64,
}

// ============================================================================
// Day Plan Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SlotParam {
    /// breakfast, secondBreakfast, lunch, afternoonSnack, dinner, supper
    pub slot: String,
    /// Meal to place in the slot
    pub meal_id: Option<i64>,
    /// Portion factor, clamped to 0.1 - 10
    pub factor: Option<f64>,
    /// Empty the slot
    #[serde(default)]
    pub clear: bool,
}

fn slot_assignments(params: Vec<SlotParam>) -> Result<Vec<SlotAssignment>, McpError> {
    params
        .into_iter()
        .map(|p| {
            let slot = MealSlot::from_key(&p.slot).ok_or_else(|| {
                McpError::invalid_params(format!("Unknown meal slot: {}", p.slot), None)
            })?;
            Ok(SlotAssignment { slot, meal_id: p.meal_id, factor: p.factor, clear: p.clear })
        })
        .collect()
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateDayPlanParams {
    pub name: String,
    /// Plan repeats over a five-day week
    #[serde(default)]
    pub for_5_days: bool,
    #[serde(default)]
    pub slots: Vec<SlotParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetDayPlanParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDayPlansParams {
    /// Name search (substring)
    pub query: Option<String>,
    /// Sort by: name (default), calories
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateDayPlanParams {
    pub id: i64,
    pub name: Option<String>,
    pub for_5_days: Option<bool>,
    #[serde(default)]
    pub slots: Vec<SlotParam>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteDayPlanParams {
    /// Day plan ID (its loose products are removed too)
    pub id: i64,
}

// ============================================================================
// Loose Product Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddLooseProductParams {
    pub day_id: i64,
    pub product_id: i64,
    /// Grams (missing means 100, 0 is kept)
    pub weight: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListLooseProductsParams {
    pub day_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateLooseProductParams {
    pub id: i64,
    pub product_id: Option<i64>,
    pub weight: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveLooseProductParams {
    pub id: i64,
}

// ============================================================================
// Calculator Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateProductParams {
    /// Product record; per-100g fields under any known name
    pub product: serde_json::Value,
    /// Grams (number or numeric string; missing means 100)
    pub weight: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateMealParams {
    /// Meal record with productsInMeal: [{product, weight}]
    pub meal: serde_json::Value,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateDayParams {
    /// Day record: breakfast..supper meal objects and factorBreakfast..factorSupper
    pub day: serde_json::Value,
    /// Loose products: [{product, weight}]
    #[serde(default)]
    pub loose_products: Vec<serde_json::Value>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl DietPlanService {
    // --- Status ---

    #[tool(description = "Get the current status of the Diet Planner service including build info, database status, and process information")]
    async fn dietplan_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database);
        to_json(&status)
    }

    #[tool(description = "Get instructions for building products, meals and day plans. Call this when starting a planning session or when unsure how the totals are computed.")]
    fn planner_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::PLANNER_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(PLANNER_INSTRUCTIONS)]))
    }

    // --- Categories ---

    #[tool(description = "Create a product category")]
    fn add_category(&self, Parameters(p): Parameters<AddCategoryParams>) -> Result<CallToolResult, McpError> {
        let result = categories::add_category(&self.database, &p.name).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List product categories with product counts")]
    fn list_categories(&self) -> Result<CallToolResult, McpError> {
        let result = categories::list_categories(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Rename a product category")]
    fn update_category(&self, Parameters(p): Parameters<UpdateCategoryParams>) -> Result<CallToolResult, McpError> {
        let result = categories::update_category(&self.database, p.id, &p.name).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(category) => to_json(&category),
            None => not_found("Category", p.id),
        }
    }

    #[tool(description = "Delete a product category. Its products are kept without a category.")]
    fn delete_category(&self, Parameters(p): Parameters<DeleteCategoryParams>) -> Result<CallToolResult, McpError> {
        let result = categories::delete_category(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Products ---

    #[tool(description = "Create a product with nutritional values per 100g")]
    fn add_product(&self, Parameters(p): Parameters<AddProductParams>) -> Result<CallToolResult, McpError> {
        let data = ProductCreate {
            name: p.name, category_id: p.category_id,
            calories_per_100: p.calories_per_100, protein_per_100: p.protein_per_100,
            carbs_per_100: p.carbs_per_100, fat_per_100: p.fat_per_100,
            sugar_per_100: p.sugar_per_100, fiber_per_100: p.fiber_per_100, salt_per_100: p.salt_per_100,
            reference_weight: p.reference_weight, unit: p.unit, description: p.description,
        };
        let result = products::add_product(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a product with its per-100g values and where it is used")]
    fn get_product(&self, Parameters(p): Parameters<GetProductParams>) -> Result<CallToolResult, McpError> {
        let result = products::get_product(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(detail) => to_json(&detail),
            None => not_found("Product", p.id),
        }
    }

    #[tool(description = "List products with optional name search, category filter, sorting (name, calories, protein) and pagination")]
    fn list_products(&self, Parameters(p): Parameters<ListProductsParams>) -> Result<CallToolResult, McpError> {
        let result = products::list_products(&self.database, p.query.as_deref(), p.category.as_deref(), &p.sort_by, p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update a product. Meals and day plans using it reflect the change immediately.")]
    fn update_product(&self, Parameters(p): Parameters<UpdateProductParams>) -> Result<CallToolResult, McpError> {
        let data = ProductUpdate {
            name: p.name, category_id: p.category_id, clear_category: p.clear_category,
            calories_per_100: p.calories_per_100, protein_per_100: p.protein_per_100,
            carbs_per_100: p.carbs_per_100, fat_per_100: p.fat_per_100,
            sugar_per_100: p.sugar_per_100, fiber_per_100: p.fiber_per_100, salt_per_100: p.salt_per_100,
            reference_weight: p.reference_weight, unit: p.unit, description: p.description,
        };
        let result = products::update_product(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a product (only allowed if no meal or day plan uses it)")]
    fn delete_product(&self, Parameters(p): Parameters<DeleteProductParams>) -> Result<CallToolResult, McpError> {
        let result = products::delete_product(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Ok(success) => to_json(&success),
            Err(blocked) => to_json(&blocked),
        }
    }

    // --- Meals ---

    #[tool(description = "Create a meal from products and gram weights. Returns the meal with computed totals.")]
    fn create_meal(&self, Parameters(p): Parameters<CreateMealParams>) -> Result<CallToolResult, McpError> {
        let data = MealCreate {
            name: p.name,
            recipe: p.recipe,
            items: p.items.into_iter().map(MealItemInput::from).collect(),
        };
        let result = meals::create_meal(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a meal with per-product contributions and totals")]
    fn get_meal(&self, Parameters(p): Parameters<GetMealParams>) -> Result<CallToolResult, McpError> {
        let result = meals::get_meal(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(detail) => to_json(&detail),
            None => not_found("Meal", p.id),
        }
    }

    #[tool(description = "List meals with totals, optional name search and sorting (name, calories, protein)")]
    fn list_meals(&self, Parameters(p): Parameters<ListMealsParams>) -> Result<CallToolResult, McpError> {
        let result = meals::list_meals(&self.database, p.query.as_deref(), &p.sort_by, p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update a meal's name, recipe or line items (items replaces the whole list)")]
    fn update_meal(&self, Parameters(p): Parameters<UpdateMealParams>) -> Result<CallToolResult, McpError> {
        let data = MealUpdate {
            name: p.name,
            recipe: p.recipe,
            items: p.items.map(|items| items.into_iter().map(MealItemInput::from).collect()),
        };
        let result = meals::update_meal(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a meal. Day plan slots holding it become empty.")]
    fn delete_meal(&self, Parameters(p): Parameters<DeleteMealParams>) -> Result<CallToolResult, McpError> {
        let result = meals::delete_meal(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Day Plans ---

    #[tool(description = "Create a day plan with up to six meal slots (breakfast, secondBreakfast, lunch, afternoonSnack, dinner, supper) and portion factors")]
    fn create_day_plan(&self, Parameters(p): Parameters<CreateDayPlanParams>) -> Result<CallToolResult, McpError> {
        let data = DayPlanCreate {
            name: p.name,
            for_5_days: p.for_5_days,
            slots: slot_assignments(p.slots)?,
        };
        let result = day_plans::create_day_plan(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a day plan with per-slot breakdown, loose products and day totals")]
    fn get_day_plan(&self, Parameters(p): Parameters<GetDayPlanParams>) -> Result<CallToolResult, McpError> {
        let result = day_plans::get_day_plan(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(detail) => to_json(&detail),
            None => not_found("Day plan", p.id),
        }
    }

    #[tool(description = "List day plans with totals, optional name search and sorting (name, calories)")]
    fn list_day_plans(&self, Parameters(p): Parameters<ListDayPlansParams>) -> Result<CallToolResult, McpError> {
        let result = day_plans::list_day_plans(&self.database, p.query.as_deref(), &p.sort_by, p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update a day plan: rename, toggle for_5_days, assign or clear slots, change factors (clamped to 0.1 - 10)")]
    fn update_day_plan(&self, Parameters(p): Parameters<UpdateDayPlanParams>) -> Result<CallToolResult, McpError> {
        let data = DayPlanUpdate {
            name: p.name,
            for_5_days: p.for_5_days,
            slots: slot_assignments(p.slots)?,
        };
        let result = day_plans::update_day_plan(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a day plan and its loose products")]
    fn delete_day_plan(&self, Parameters(p): Parameters<DeleteDayPlanParams>) -> Result<CallToolResult, McpError> {
        let result = day_plans::delete_day_plan(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Loose Products ---

    #[tool(description = "Attach a product to a day plan outside any meal")]
    fn add_loose_product(&self, Parameters(p): Parameters<AddLooseProductParams>) -> Result<CallToolResult, McpError> {
        let data = LooseProductCreate { day_id: p.day_id, product_id: p.product_id, weight: p.weight };
        let result = day_plans::add_loose_product(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List the loose products of a day plan with their contributions")]
    fn list_loose_products(&self, Parameters(p): Parameters<ListLooseProductsParams>) -> Result<CallToolResult, McpError> {
        let result = day_plans::list_loose_products(&self.database, p.day_id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Change the product or weight of a loose product")]
    fn update_loose_product(&self, Parameters(p): Parameters<UpdateLooseProductParams>) -> Result<CallToolResult, McpError> {
        let data = LooseProductUpdate { product_id: p.product_id, weight: p.weight };
        let result = day_plans::update_loose_product(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Remove a loose product from its day plan")]
    fn remove_loose_product(&self, Parameters(p): Parameters<RemoveLooseProductParams>) -> Result<CallToolResult, McpError> {
        let result = day_plans::remove_loose_product(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Calculators ---

    #[tool(description = "Compute the macros of a weight of a product record you supply (no database access)")]
    fn calculate_product_macros(&self, Parameters(p): Parameters<CalculateProductParams>) -> Result<CallToolResult, McpError> {
        let weight = calculator::weight_arg(p.weight.as_ref());
        let result = calculator::calculate_product_macros(p.product, weight)
            .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Compute the totals of a meal record you supply (no database access)")]
    fn calculate_meal_macros(&self, Parameters(p): Parameters<CalculateMealParams>) -> Result<CallToolResult, McpError> {
        let result = calculator::calculate_meal_macros(p.meal).map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Compute the totals of a day record and its loose products you supply (no database access)")]
    fn calculate_day_macros(&self, Parameters(p): Parameters<CalculateDayParams>) -> Result<CallToolResult, McpError> {
        let result = calculator::calculate_day_macros(p.day, p.loose_products)
            .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for DietPlanService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dietplan".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Diet Planner".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Diet Planner - product catalog, meals and daily meal plans with macro totals. \
                 IMPORTANT: Call planner_instructions before building meals or day plans. \
                 Categories: add/list/update/delete_category. \
                 Products (per 100g): add/get/list/update/delete_product. \
                 Meals: create/get/list/update/delete_meal. \
                 Day plans: create/get/list/update/delete_day_plan (six slots with factors). \
                 Loose products: add/list/update/remove_loose_product. \
                 Calculators (no database): calculate_product_macros, calculate_meal_macros, calculate_day_macros."
                    .into(),
            ),
        }
    }
}
