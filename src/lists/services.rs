use time::{OffsetDateTime, Time};

use super::{
    dto::{CreateGroceryListRequest, LineItemInput, UpdateGroceryListRequest},
    repo_types::{LineItem, ListPatch, NewGroceryList},
};

const MAX_NAME_LEN: usize = 100;

fn validate_name(name: &str) -> Result<String, &'static str> {
    let name = name.trim();
    if name.is_empty() {
        return Err("List name is required");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err("List name cannot exceed 100 characters");
    }
    Ok(name.to_string())
}

fn validate_items(
    items: Vec<LineItemInput>,
    now: OffsetDateTime,
) -> Result<Vec<LineItem>, &'static str> {
    let start_of_today = now.replace_time(Time::MIDNIGHT);
    items
        .into_iter()
        .map(|input| {
            if input.quantity < 1 {
                return Err("Quantity must be at least 1");
            }
            if input.expiry_date.is_some_and(|d| d < start_of_today) {
                return Err("Expiry date must be today or in the future");
            }
            Ok(LineItem {
                item: input.item,
                quantity: input.quantity,
                expiry_date: input.expiry_date,
                added_at: now,
            })
        })
        .collect()
}

pub fn validate_new_list(
    req: CreateGroceryListRequest,
    now: OffsetDateTime,
) -> Result<NewGroceryList, &'static str> {
    let name = validate_name(&req.name)?;
    if req.items.is_empty() {
        return Err("Items array cannot be empty");
    }
    let items = validate_items(req.items, now)?;
    Ok(NewGroceryList { name, items })
}

pub fn validate_patch(
    req: UpdateGroceryListRequest,
    now: OffsetDateTime,
) -> Result<ListPatch, &'static str> {
    if req.name.is_none() && req.status.is_none() && req.items.is_none() {
        return Err("Nothing to update");
    }
    Ok(ListPatch {
        name: req.name.as_deref().map(validate_name).transpose()?,
        status: req.status,
        items: req.items.map(|items| validate_items(items, now)).transpose()?,
    })
}
