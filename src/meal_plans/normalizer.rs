//! Canonicalises whatever the workflow service sent back into `MealPlan`s.
//!
//! The service's output shape is not stable, so matching runs as an ordered
//! chain over a tagged view of the JSON. The first matcher that recognises the
//! payload wins; adding a new shape means adding one entry to [`MATCHERS`].

use serde_json::{Map, Value};
use tracing::debug;

use super::{error::GenerationError, types::MealPlan};

const DEFAULT_TIME: &str = "Not specified";
const DEFAULT_DIFFICULTY: &str = "Medium";
const DEFAULT_SERVINGS: u32 = 2;
const DEFAULT_COOKING_METHOD: &str = "Various";

/// Top-level structure of a raw response.
#[derive(Debug, Clone, Copy)]
enum Shape<'a> {
    Array(&'a [Value]),
    Object(&'a Map<String, Value>),
}

impl<'a> Shape<'a> {
    fn of(raw: &'a Value) -> Option<Self> {
        match raw {
            Value::Array(items) => Some(Shape::Array(items)),
            Value::Object(map) => Some(Shape::Object(map)),
            _ => None,
        }
    }
}

type Matcher = for<'a> fn(Shape<'a>) -> Option<&'a [Value]>;

const MATCHERS: &[(&str, Matcher)] = &[
    ("array_wrapped_success", array_wrapped_success),
    ("array_wrapped_meals", array_wrapped_meals),
    ("bare_meal_array", bare_meal_array),
    ("object_success", object_success),
    ("object_meals", object_meals),
];

pub fn normalize(raw: &Value) -> Result<Vec<MealPlan>, GenerationError> {
    let shape = Shape::of(raw).ok_or(GenerationError::Normalization(
        "response is neither an array nor an object",
    ))?;

    let (matched, candidates) = MATCHERS
        .iter()
        .find_map(|(name, matcher)| matcher(shape).map(|c| (*name, c)))
        .ok_or(GenerationError::Normalization(
            "response matches no known meal plan shape",
        ))?;
    debug!(shape = matched, candidates = candidates.len(), "meal plan response matched");

    let plans: Vec<MealPlan> = candidates
        .iter()
        .enumerate()
        .filter_map(|(idx, candidate)| candidate.as_object().map(|obj| to_meal_plan(idx + 1, obj)))
        .collect();

    if plans.is_empty() {
        return Err(GenerationError::Normalization("no meal plans in response"));
    }
    Ok(plans)
}

fn success_plans(map: &Map<String, Value>) -> Option<&[Value]> {
    if map.get("success").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    map.get("mealPlans").and_then(Value::as_array).map(Vec::as_slice)
}

fn meals(map: &Map<String, Value>) -> Option<&[Value]> {
    map.get("meals").and_then(Value::as_array).map(Vec::as_slice)
}

fn first_object<'a>(items: &'a [Value]) -> Option<&'a Map<String, Value>> {
    items.first().and_then(Value::as_object)
}

fn array_wrapped_success(shape: Shape<'_>) -> Option<&[Value]> {
    match shape {
        Shape::Array(items) => first_object(items).and_then(success_plans),
        Shape::Object(_) => None,
    }
}

fn array_wrapped_meals(shape: Shape<'_>) -> Option<&[Value]> {
    match shape {
        Shape::Array(items) => first_object(items).and_then(meals),
        Shape::Object(_) => None,
    }
}

fn bare_meal_array(shape: Shape<'_>) -> Option<&[Value]> {
    match shape {
        Shape::Array(items) if !items.is_empty() && items.iter().all(looks_like_meal) => {
            Some(items)
        }
        _ => None,
    }
}

fn object_success(shape: Shape<'_>) -> Option<&[Value]> {
    match shape {
        Shape::Object(map) => success_plans(map),
        Shape::Array(_) => None,
    }
}

fn object_meals(shape: Shape<'_>) -> Option<&[Value]> {
    match shape {
        Shape::Object(map) => meals(map),
        Shape::Array(_) => None,
    }
}

fn looks_like_meal(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.get("name").is_some_and(Value::is_string)
        && (obj.contains_key("description") || obj.contains_key("instructions"))
}

fn to_meal_plan(position: usize, obj: &Map<String, Value>) -> MealPlan {
    MealPlan {
        name: text(obj.get("name")).unwrap_or_else(|| format!("Meal {position}")),
        description: text(obj.get("description")).unwrap_or_default(),
        ingredients: string_list(obj.get("ingredients")),
        instructions: instructions(obj.get("instructions")),
        prep_time: text(obj.get("prepTime")).unwrap_or_else(|| DEFAULT_TIME.into()),
        cook_time: text(obj.get("cookTime")).unwrap_or_else(|| DEFAULT_TIME.into()),
        difficulty: text(obj.get("difficulty")).unwrap_or_else(|| DEFAULT_DIFFICULTY.into()),
        servings: servings(obj.get("servings")).unwrap_or(DEFAULT_SERVINGS),
        nutrition_highlights: string_list(obj.get("nutritionHighlights")),
        cooking_method: text(obj.get("cookingMethod"))
            .unwrap_or_else(|| DEFAULT_COOKING_METHOD.into()),
    }
}

/// Strings pass through; numbers are rendered. Empty strings count as missing.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn instructions(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(steps)) => steps
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(obj) => text(obj.get("name")),
            _ => None,
        })
        .collect()
}

fn servings(value: Option<&Value>) -> Option<u32> {
    let parsed = match value? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_meals() -> Value {
        json!([
            {
                "name": "Veggie omelette",
                "description": "Fluffy eggs with spinach",
                "ingredients": ["eggs", "spinach"],
                "instructions": ["Whisk eggs.", "Cook with spinach."],
                "prepTime": "5 minutes",
                "cookTime": "10 minutes",
                "difficulty": "Easy",
                "servings": 1,
                "nutritionHighlights": ["High protein"],
                "cookingMethod": "Pan-fry"
            },
            { "name": "Rice bowl", "instructions": "Steam rice." }
        ])
    }

    #[test]
    fn wrapped_and_unwrapped_success_payloads_agree() {
        let object = json!({ "success": true, "mealPlans": sample_meals() });
        let wrapped = json!([{ "success": true, "mealPlans": sample_meals() }]);

        let a = normalize(&object).unwrap();
        let b = normalize(&wrapped).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].instructions, "Whisk eggs. Cook with spinach.");
        assert_eq!(a[0].servings, 1);
    }

    #[test]
    fn name_only_meal_gets_every_default() {
        let plans = normalize(&json!({ "meals": [{ "name": "X" }] })).unwrap();

        assert_eq!(
            plans,
            vec![MealPlan {
                name: "X".into(),
                description: String::new(),
                ingredients: vec![],
                instructions: String::new(),
                prep_time: "Not specified".into(),
                cook_time: "Not specified".into(),
                difficulty: "Medium".into(),
                servings: 2,
                nutrition_highlights: vec![],
                cooking_method: "Various".into(),
            }]
        );
    }

    #[test]
    fn missing_names_use_one_based_position() {
        let plans = normalize(&json!({
            "success": true,
            "mealPlans": [{ "name": "First" }, { "description": "no name here" }]
        }))
        .unwrap();

        assert_eq!(plans[1].name, "Meal 2");
        assert_eq!(plans[1].description, "no name here");
    }

    #[test]
    fn array_wrapped_meals_shape() {
        let plans = normalize(&json!([{ "meals": [{ "name": "Soup", "servings": "4" }] }])).unwrap();
        assert_eq!(plans[0].name, "Soup");
        assert_eq!(plans[0].servings, 4);
    }

    #[test]
    fn bare_array_of_meals_is_used_directly() {
        let plans = normalize(&sample_meals()).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[1].name, "Rice bowl");
        assert_eq!(plans[1].cooking_method, "Various");
    }

    #[test]
    fn array_precedence_prefers_wrapped_success() {
        // First element carries both markers; the success wrapper wins.
        let raw = json!([{
            "success": true,
            "mealPlans": [{ "name": "From plans" }],
            "meals": [{ "name": "From meals" }]
        }]);
        assert_eq!(normalize(&raw).unwrap()[0].name, "From plans");
    }

    #[test]
    fn success_false_falls_through_to_meals() {
        let raw = json!({
            "success": false,
            "mealPlans": [{ "name": "ignored" }],
            "meals": [{ "name": "used" }]
        });
        assert_eq!(normalize(&raw).unwrap()[0].name, "used");
    }

    #[test]
    fn ingredient_objects_are_flattened_to_names() {
        let plans = normalize(&json!({
            "meals": [{ "name": "Salad", "ingredients": [{ "name": "lettuce", "qty": 1 }, "tomato", null] }]
        }))
        .unwrap();
        assert_eq!(plans[0].ingredients, vec!["lettuce", "tomato"]);
    }

    #[test]
    fn rejects_empty_array() {
        assert!(matches!(
            normalize(&json!([])),
            Err(GenerationError::Normalization(_))
        ));
    }

    #[test]
    fn rejects_object_without_known_keys() {
        assert!(matches!(
            normalize(&json!({ "result": "ok", "data": [] })),
            Err(GenerationError::Normalization(_))
        ));
    }

    #[test]
    fn rejects_array_of_nameless_objects() {
        assert!(matches!(
            normalize(&json!([{ "description": "a" }, { "instructions": "b" }])),
            Err(GenerationError::Normalization(_))
        ));
    }

    #[test]
    fn rejects_success_with_empty_plans() {
        assert!(matches!(
            normalize(&json!({ "success": true, "mealPlans": [] })),
            Err(GenerationError::Normalization(_))
        ));
    }

    #[test]
    fn rejects_scalars() {
        assert!(normalize(&json!("meal plans coming soon")).is_err());
        assert!(normalize(&Value::Null).is_err());
    }
}
