use chrono::NaiveDate;
use tracing::info;

use henhouse_core::{new_id, now_rfc3339, ListResult};
use henhouse_sql::Value;

use crate::model::{
    CreateExpenditure, CreateSale, Expenditure, FinanceQuery, InventoryAction, InventoryItem,
    Sale, UpdateExpenditure, UpdateSale,
};
use crate::service::schema::{EXPENDITURES, SALES};
use crate::service::{page, validate, FarmError, FarmService};

/// Expense categories that carry over to a stock item created from them.
const STOCK_CATEGORIES: &[&str] = &["feed", "medicine", "equipment"];

/// A new stock item requested alongside an expense.
struct NewStock<'a> {
    name: &'a str,
    unit: Option<&'a str>,
}

impl FarmService {
    // ── Expenditures ──

    /// Record an expense, optionally feeding a stock item.
    pub fn create_expenditure(
        &self,
        farmer_id: &str,
        input: CreateExpenditure,
    ) -> Result<Expenditure, FarmError> {
        if let Some(flock_id) = &input.flock_id {
            self.get_flock(farmer_id, flock_id)?;
        }

        let now = now_rfc3339();
        let mut expense = Expenditure {
            id: new_id(),
            farmer_id: farmer_id.to_string(),
            flock_id: input.flock_id,
            date: input.date,
            category: input.category.trim().to_string(),
            description: input.description.trim().to_string(),
            amount: input.amount,
            quantity: input.quantity,
            unit: input.unit,
            mpesa_transaction_id: input.mpesa_transaction_id,
            inventory_item_id: None,
            created_at: now.clone(),
            updated_at: now,
        };
        validate_expenditure(&expense)?;

        let linked = match (input.create_inventory_item, input.new_inventory_name.as_deref()) {
            (true, Some(name)) if !name.trim().is_empty() => {
                let stock = NewStock {
                    name,
                    unit: input.new_inventory_unit.as_deref(),
                };
                let note = format!("Created via Expense: {}", expense.description);
                Some(self.stock_from_expense(&expense, &stock, expense.date, note)?)
            }
            _ => match input.inventory_item_id.as_deref() {
                Some(item_id) => Some(self.restock_from_expense(&expense, item_id)?),
                None => None,
            },
        };
        expense.inventory_item_id = linked.as_ref().map(|item| item.id.clone());

        self.insert_record(EXPENDITURES, &expense.id, &expense, &expenditure_indexes(&expense, true))?;
        info!(
            expense_id = %expense.id,
            farmer_id,
            amount = expense.amount,
            category = %expense.category,
            "recorded expenditure"
        );

        if let Some(item) = linked {
            self.check_low_stock(&item, expense.flock_id.as_deref())?;
        }
        Ok(expense)
    }

    /// Create a stock item out of an expense line.
    fn stock_from_expense(
        &self,
        expense: &Expenditure,
        stock: &NewStock<'_>,
        date: NaiveDate,
        note: String,
    ) -> Result<InventoryItem, FarmError> {
        let quantity = expense.quantity.unwrap_or(0.0);
        let category = if STOCK_CATEGORIES.contains(&expense.category.as_str()) {
            expense.category.clone()
        } else {
            "other".to_string()
        };
        let unit = stock
            .unit
            .or(expense.unit.as_deref())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or("units");

        let now = now_rfc3339();
        let item = InventoryItem {
            id: new_id(),
            farmer_id: expense.farmer_id.clone(),
            name: stock.name.trim().to_string(),
            category,
            quantity,
            unit: unit.trim().to_string(),
            minimum_stock: 0.0,
            cost_per_unit: if quantity > 0.0 { expense.amount / quantity } else { 0.0 },
            last_restocked: Some(date),
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        };
        self.insert_inventory_item(&item)?;
        if quantity > 0.0 {
            self.record_inventory_history(
                &item,
                &expense.farmer_id,
                date,
                InventoryAction::Purchase,
                quantity,
                Some(note),
            )?;
        }
        info!(item_id = %item.id, expense_id = %expense.id, "created inventory item from expense");
        Ok(item)
    }

    /// Add an expense's quantity to an existing stock item.
    fn restock_from_expense(
        &self,
        expense: &Expenditure,
        item_id: &str,
    ) -> Result<InventoryItem, FarmError> {
        let mut item = self.get_inventory_item(&expense.farmer_id, item_id)?;
        if let Some(quantity) = expense.quantity.filter(|q| *q > 0.0) {
            item.quantity += quantity;
            if expense.amount > 0.0 {
                item.cost_per_unit = expense.amount / quantity;
            }
            self.record_inventory_history(
                &item,
                &expense.farmer_id,
                expense.date,
                InventoryAction::Purchase,
                quantity,
                Some(format!("Expense: {}", expense.description)),
            )?;
        }
        item.last_restocked = Some(expense.date);
        item.updated_at = now_rfc3339();
        self.save_inventory_item(&item)?;
        Ok(item)
    }

    pub fn get_expenditure(&self, farmer_id: &str, id: &str) -> Result<Expenditure, FarmError> {
        self.get_owned(EXPENDITURES, id, farmer_id, "Expenditure")
    }

    /// Expenses, latest first, optionally for one flock.
    pub fn list_expenditures(
        &self,
        farmer_id: &str,
        query: &FinanceQuery,
    ) -> Result<ListResult<Expenditure>, FarmError> {
        let mut filters: Vec<(&str, Value)> = vec![("farmer_id", Value::from(farmer_id))];
        if let Some(flock_id) = &query.flock_id {
            filters.push(("flock_id", Value::from(flock_id.clone())));
        }
        let (items, total) = self.list_records(
            EXPENDITURES,
            &filters,
            "date DESC",
            &page(query.skip, query.limit),
        )?;
        Ok(ListResult { items, total })
    }

    /// Update an expense. Linking an existing item only sets the link;
    /// stock is not adjusted.
    pub fn update_expenditure(
        &self,
        farmer_id: &str,
        id: &str,
        input: UpdateExpenditure,
    ) -> Result<Expenditure, FarmError> {
        let mut expense = self.get_expenditure(farmer_id, id)?;

        if let Some(flock_id) = &input.flock_id {
            self.get_flock(farmer_id, flock_id)?;
            expense.flock_id = Some(flock_id.clone());
        }
        if let Some(date) = input.date {
            expense.date = date;
        }
        if let Some(category) = input.category {
            expense.category = category.trim().to_string();
        }
        if let Some(description) = input.description {
            expense.description = description.trim().to_string();
        }
        if let Some(amount) = input.amount {
            expense.amount = amount;
        }
        if input.quantity.is_some() {
            expense.quantity = input.quantity;
        }
        if input.unit.is_some() {
            expense.unit = input.unit;
        }
        if input.mpesa_transaction_id.is_some() {
            expense.mpesa_transaction_id = input.mpesa_transaction_id;
        }
        validate_expenditure(&expense)?;

        let mut created = None;
        match (input.create_inventory_item, input.new_inventory_name.as_deref()) {
            (true, Some(name)) if !name.trim().is_empty() => {
                let stock = NewStock {
                    name,
                    unit: input.new_inventory_unit.as_deref(),
                };
                let note = format!("Created via Expense Update: {}", expense.description);
                let item = self.stock_from_expense(&expense, &stock, expense.date, note)?;
                expense.inventory_item_id = Some(item.id.clone());
                created = Some(item);
            }
            _ => {
                if let Some(item_id) = input.inventory_item_id {
                    self.get_inventory_item(farmer_id, &item_id)?;
                    expense.inventory_item_id = Some(item_id);
                }
            }
        }

        expense.updated_at = now_rfc3339();
        self.update_record(EXPENDITURES, &expense.id, &expense, &expenditure_indexes(&expense, false))?;
        if let Some(item) = created {
            self.check_low_stock(&item, expense.flock_id.as_deref())?;
        }
        Ok(expense)
    }

    pub fn delete_expenditure(&self, farmer_id: &str, id: &str) -> Result<(), FarmError> {
        self.delete_owned(EXPENDITURES, id, farmer_id, "Expenditure")
    }

    // ── Sales ──

    pub fn create_sale(&self, farmer_id: &str, input: CreateSale) -> Result<Sale, FarmError> {
        self.get_flock(farmer_id, &input.flock_id)?;
        let now = now_rfc3339();
        let sale = Sale {
            id: new_id(),
            farmer_id: farmer_id.to_string(),
            flock_id: input.flock_id,
            date: input.date,
            quantity: input.quantity,
            price_per_bird: input.price_per_bird,
            total_amount: input.total_amount,
            buyer_name: input.buyer_name,
            buyer_phone: input.buyer_phone,
            notes: input.notes,
            mpesa_transaction_id: input.mpesa_transaction_id,
            average_weight_grams: input.average_weight_grams,
            created_at: now.clone(),
            updated_at: now,
        };
        validate_sale(&sale)?;
        self.insert_record(SALES, &sale.id, &sale, &sale_indexes(&sale, true))?;
        info!(
            sale_id = %sale.id,
            flock_id = %sale.flock_id,
            birds = sale.quantity,
            total = sale.total_amount,
            "recorded sale"
        );
        Ok(sale)
    }

    pub fn get_sale(&self, farmer_id: &str, id: &str) -> Result<Sale, FarmError> {
        self.get_owned(SALES, id, farmer_id, "Sale record")
    }

    pub fn list_sales(
        &self,
        farmer_id: &str,
        query: &FinanceQuery,
    ) -> Result<ListResult<Sale>, FarmError> {
        let mut filters: Vec<(&str, Value)> = vec![("farmer_id", Value::from(farmer_id))];
        if let Some(flock_id) = &query.flock_id {
            filters.push(("flock_id", Value::from(flock_id.clone())));
        }
        let (items, total) =
            self.list_records(SALES, &filters, "date DESC", &page(query.skip, query.limit))?;
        Ok(ListResult { items, total })
    }

    pub fn update_sale(
        &self,
        farmer_id: &str,
        id: &str,
        input: UpdateSale,
    ) -> Result<Sale, FarmError> {
        let mut sale = self.get_sale(farmer_id, id)?;
        if let Some(flock_id) = input.flock_id {
            self.get_flock(farmer_id, &flock_id)?;
            sale.flock_id = flock_id;
        }
        if let Some(date) = input.date {
            sale.date = date;
        }
        if let Some(quantity) = input.quantity {
            sale.quantity = quantity;
        }
        if let Some(price) = input.price_per_bird {
            sale.price_per_bird = price;
        }
        if let Some(total) = input.total_amount {
            sale.total_amount = total;
        }
        if input.buyer_name.is_some() {
            sale.buyer_name = input.buyer_name;
        }
        if input.buyer_phone.is_some() {
            sale.buyer_phone = input.buyer_phone;
        }
        if input.notes.is_some() {
            sale.notes = input.notes;
        }
        if input.mpesa_transaction_id.is_some() {
            sale.mpesa_transaction_id = input.mpesa_transaction_id;
        }
        if input.average_weight_grams.is_some() {
            sale.average_weight_grams = input.average_weight_grams;
        }
        validate_sale(&sale)?;

        sale.updated_at = now_rfc3339();
        self.update_record(SALES, &sale.id, &sale, &sale_indexes(&sale, false))?;
        Ok(sale)
    }

    pub fn delete_sale(&self, farmer_id: &str, id: &str) -> Result<(), FarmError> {
        self.delete_owned(SALES, id, farmer_id, "Sale record")
    }
}

fn validate_expenditure(e: &Expenditure) -> Result<(), FarmError> {
    validate::required_text("category", &e.category, 50)?;
    validate::required_text("description", &e.description, 255)?;
    validate::non_negative("amount", e.amount)?;
    if let Some(q) = e.quantity {
        validate::non_negative("quantity", q)?;
    }
    validate::optional_text("unit", &e.unit, 20)?;
    validate::optional_text("mpesa_transaction_id", &e.mpesa_transaction_id, 50)?;
    Ok(())
}

fn validate_sale(s: &Sale) -> Result<(), FarmError> {
    validate::positive_count("quantity", s.quantity)?;
    validate::non_negative("price_per_bird", s.price_per_bird)?;
    validate::non_negative("total_amount", s.total_amount)?;
    validate::optional_text("buyer_name", &s.buyer_name, 255)?;
    validate::optional_text("buyer_phone", &s.buyer_phone, 20)?;
    validate::optional_text("mpesa_transaction_id", &s.mpesa_transaction_id, 50)?;
    if let Some(w) = s.average_weight_grams {
        validate::positive("average_weight_grams", w)?;
    }
    Ok(())
}

fn expenditure_indexes(e: &Expenditure, with_created: bool) -> Vec<(&'static str, Value)> {
    let mut cols = vec![
        ("farmer_id", Value::from(e.farmer_id.clone())),
        ("flock_id", Value::from(e.flock_id.clone())),
        ("inventory_item_id", Value::from(e.inventory_item_id.clone())),
        ("date", Value::from(e.date.to_string())),
        ("category", Value::from(e.category.clone())),
        ("amount", Value::from(e.amount)),
        ("updated_at", Value::from(e.updated_at.clone())),
    ];
    if with_created {
        cols.push(("created_at", Value::from(e.created_at.clone())));
    }
    cols
}

fn sale_indexes(s: &Sale, with_created: bool) -> Vec<(&'static str, Value)> {
    let mut cols = vec![
        ("farmer_id", Value::from(s.farmer_id.clone())),
        ("flock_id", Value::from(s.flock_id.clone())),
        ("date", Value::from(s.date.to_string())),
        ("quantity", Value::from(s.quantity)),
        ("total_amount", Value::from(s.total_amount)),
        ("updated_at", Value::from(s.updated_at.clone())),
    ];
    if with_created {
        cols.push(("created_at", Value::from(s.created_at.clone())));
    }
    cols
}
