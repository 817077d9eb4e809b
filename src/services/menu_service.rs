use crate::config::KioskConfig;
use crate::entities::{menu_item_entity as items, topping_entity as toppings};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateMenuItemRequest, CreateToppingRequest, CsvImportResult, MenuItemResponse, MenuQuery,
    ToppingResponse, UpdateMenuItemRequest, UpdateToppingRequest,
};
use crate::utils::parse_amount;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;

#[derive(Clone)]
pub struct MenuService {
    pool: DatabaseConnection,
    kiosk: KioskConfig,
}

impl MenuService {
    pub fn new(pool: DatabaseConnection, kiosk: KioskConfig) -> Self {
        Self { pool, kiosk }
    }

    fn respond(&self, item: items::Model) -> MenuItemResponse {
        MenuItemResponse::new(item, &self.kiosk)
    }

    pub async fn list_items(&self, query: &MenuQuery) -> AppResult<Vec<MenuItemResponse>> {
        let mut select = items::Entity::find();
        if let Some(category) = query.category.as_deref().map(str::trim)
            && !category.is_empty()
        {
            select = select.filter(items::Column::Category.eq(category));
        }
        if query.available_only.unwrap_or(false) {
            select = select.filter(items::Column::IsAvailable.eq(true));
        }
        let list = select
            .order_by_asc(items::Column::Category)
            .order_by_asc(items::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(|m| self.respond(m)).collect())
    }

    pub async fn list_categories(&self) -> AppResult<Vec<String>> {
        let categories: Vec<String> = items::Entity::find()
            .select_only()
            .column(items::Column::Category)
            .distinct()
            .order_by_asc(items::Column::Category)
            .into_tuple()
            .all(&self.pool)
            .await?;
        Ok(categories)
    }

    pub async fn get_item(&self, id: i64) -> AppResult<MenuItemResponse> {
        Ok(self.respond(find_item(&self.pool, id).await?))
    }

    pub async fn create_item(&self, req: CreateMenuItemRequest) -> AppResult<MenuItemResponse> {
        let category = required_text("category", &req.category)?;
        let name = required_text("name", &req.name)?;
        non_negative("price", req.price)?;
        non_negative("cost", req.cost)?;
        if let Some(stock) = req.stock {
            non_negative("stock", i64::from(stock))?;
        }
        let min_stock = req.min_stock.unwrap_or(self.kiosk.default_min_stock);
        non_negative("min_stock", i64::from(min_stock))?;

        ensure_unique_item(&self.pool, &category, &name, None).await?;

        let now = Utc::now();
        let item = items::ActiveModel {
            category: Set(category),
            name: Set(name),
            description: Set(clean_optional(req.description)),
            price: Set(req.price),
            cost: Set(req.cost),
            stock: Set(req.stock),
            min_stock: Set(min_stock),
            is_available: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;
        log::info!("Menu item created: {} / {}", item.category, item.name);
        Ok(self.respond(item))
    }

    pub async fn update_item(
        &self,
        id: i64,
        req: UpdateMenuItemRequest,
    ) -> AppResult<MenuItemResponse> {
        let item = find_item(&self.pool, id).await?;

        let category = match &req.category {
            Some(c) => required_text("category", c)?,
            None => item.category.clone(),
        };
        let name = match &req.name {
            Some(n) => required_text("name", n)?,
            None => item.name.clone(),
        };
        if category != item.category || name != item.name {
            ensure_unique_item(&self.pool, &category, &name, Some(id)).await?;
        }

        let mut am = item.into_active_model();
        am.category = Set(category);
        am.name = Set(name);
        if let Some(description) = req.description {
            am.description = Set(clean_optional(Some(description)));
        }
        if let Some(price) = req.price {
            non_negative("price", price)?;
            am.price = Set(price);
        }
        if let Some(cost) = req.cost {
            non_negative("cost", cost)?;
            am.cost = Set(cost);
        }
        if req.untrack_stock.unwrap_or(false) {
            am.stock = Set(None);
        } else if let Some(stock) = req.stock {
            non_negative("stock", i64::from(stock))?;
            am.stock = Set(Some(stock));
        }
        if let Some(min_stock) = req.min_stock {
            non_negative("min_stock", i64::from(min_stock))?;
            am.min_stock = Set(min_stock);
        }
        am.updated_at = Set(Utc::now());
        let updated = am.update(&self.pool).await?;
        Ok(self.respond(updated))
    }

    /// 软下架 / 重新上架，菜单项不做物理删除
    pub async fn set_availability(&self, id: i64, is_available: bool) -> AppResult<MenuItemResponse> {
        let item = find_item(&self.pool, id).await?;
        let mut am = item.into_active_model();
        am.is_available = Set(is_available);
        am.updated_at = Set(Utc::now());
        Ok(self.respond(am.update(&self.pool).await?))
    }

    /// 调整库存；未跟踪库存的菜品在正数入库时开始跟踪
    pub async fn restock(&self, id: i64, delta: i32) -> AppResult<MenuItemResponse> {
        if delta == 0 {
            return Err(AppError::ValidationError(
                "Stock adjustment must not be zero".to_string(),
            ));
        }
        let item = find_item(&self.pool, id).await?;

        match item.stock {
            None if delta < 0 => {
                return Err(AppError::ValidationError(format!(
                    "Stock is not tracked for {}",
                    item.name
                )));
            }
            None => {
                let mut am = item.into_active_model();
                am.stock = Set(Some(delta));
                am.updated_at = Set(Utc::now());
                am.update(&self.pool).await?;
            }
            Some(_) => {
                // 条件更新，结果须落在 0..=i32::MAX
                let delta = i64::from(delta);
                let res = items::Entity::update_many()
                    .col_expr(
                        items::Column::Stock,
                        Expr::col(items::Column::Stock).add(delta),
                    )
                    .col_expr(items::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(items::Column::Id.eq(id))
                    .filter(items::Column::Stock.gte(-delta))
                    .filter(items::Column::Stock.lte(i64::from(i32::MAX) - delta))
                    .exec(&self.pool)
                    .await?;
                if res.rows_affected == 0 {
                    let message = if delta < 0 {
                        format!("Stock for {} cannot go below 0", item.name)
                    } else {
                        format!("Stock for {} would exceed {}", item.name, i32::MAX)
                    };
                    return Err(AppError::ValidationError(message));
                }
            }
        }

        let updated = find_item(&self.pool, id).await?;
        log::info!(
            "Stock adjusted for {} by {delta}, now {:?}",
            updated.name,
            updated.stock
        );
        Ok(self.respond(updated))
    }

    /// 低库存：仅统计跟踪库存的菜品，`stock <= min_stock`
    pub async fn low_stock(&self) -> AppResult<Vec<MenuItemResponse>> {
        let list = items::Entity::find()
            .filter(items::Column::Stock.is_not_null())
            .filter(Expr::col(items::Column::Stock).lte(Expr::col(items::Column::MinStock)))
            .order_by_asc(items::Column::Stock)
            .order_by_asc(items::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(|m| self.respond(m)).collect())
    }

    pub async fn list_toppings(&self, available_only: bool) -> AppResult<Vec<ToppingResponse>> {
        let mut select = toppings::Entity::find();
        if available_only {
            select = select.filter(toppings::Column::IsAvailable.eq(true));
        }
        let list = select
            .order_by_asc(toppings::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn create_topping(&self, req: CreateToppingRequest) -> AppResult<ToppingResponse> {
        let name = required_text("name", &req.name)?;
        non_negative("price", req.price)?;
        ensure_unique_topping(&self.pool, &name, None).await?;

        let now = Utc::now();
        let topping = toppings::ActiveModel {
            name: Set(name),
            price: Set(req.price),
            is_available: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;
        Ok(topping.into())
    }

    pub async fn update_topping(
        &self,
        id: i64,
        req: UpdateToppingRequest,
    ) -> AppResult<ToppingResponse> {
        let topping = toppings::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Topping not found".to_string()))?;

        let mut am = topping.into_active_model();
        if let Some(name) = &req.name {
            let name = required_text("name", name)?;
            ensure_unique_topping(&self.pool, &name, Some(id)).await?;
            am.name = Set(name);
        }
        if let Some(price) = req.price {
            non_negative("price", price)?;
            am.price = Set(price);
        }
        if let Some(is_available) = req.is_available {
            am.is_available = Set(is_available);
        }
        am.updated_at = Set(Utc::now());
        Ok(am.update(&self.pool).await?.into())
    }

    /// 导入菜单 CSV（表头 `category,item,price,cost,stock`），按 (category, item) 新增或更新。
    /// 任意一行无效则整体回滚。
    pub async fn import_csv(&self, data: &str) -> AppResult<CsvImportResult> {
        let rows = parse_menu_csv(data)?;
        if rows.is_empty() {
            return Err(AppError::ValidationError("CSV contains no rows".to_string()));
        }

        let txn = self.pool.begin().await?;
        let mut result = CsvImportResult::default();
        let now = Utc::now();

        for row in rows {
            let existing = items::Entity::find()
                .filter(items::Column::Category.eq(row.category.as_str()))
                .filter(items::Column::Name.eq(row.name.as_str()))
                .one(&txn)
                .await?;

            match existing {
                Some(item) => {
                    let mut am = item.into_active_model();
                    am.price = Set(row.price);
                    am.cost = Set(row.cost);
                    if row.stock.is_some() {
                        am.stock = Set(row.stock);
                    }
                    am.updated_at = Set(now);
                    am.update(&txn).await?;
                    result.updated += 1;
                }
                None => {
                    items::ActiveModel {
                        category: Set(row.category),
                        name: Set(row.name),
                        description: Set(None),
                        price: Set(row.price),
                        cost: Set(row.cost),
                        stock: Set(row.stock),
                        min_stock: Set(self.kiosk.default_min_stock),
                        is_available: Set(true),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                    result.created += 1;
                }
            }
        }

        txn.commit().await?;
        log::info!(
            "Menu CSV imported: {} created, {} updated",
            result.created,
            result.updated
        );
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct CsvMenuRecord {
    category: String,
    item: String,
    price: String,
    cost: String,
    #[serde(default)]
    stock: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
struct MenuCsvRow {
    category: String,
    name: String,
    price: i64,
    cost: i64,
    stock: Option<i32>,
}

fn parse_menu_csv(data: &str) -> AppResult<Vec<MenuCsvRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<CsvMenuRecord>().enumerate() {
        // 表头占第 1 行
        let line = idx + 2;
        let record = record?;
        let with_line = |e: AppError| match e {
            AppError::ValidationError(msg) => {
                AppError::ValidationError(format!("Row {line}: {msg}"))
            }
            other => other,
        };

        let category = required_text("category", &record.category).map_err(with_line)?;
        let name = required_text("item", &record.item).map_err(with_line)?;
        let price = parse_amount(&record.price).map_err(with_line)?;
        let cost = parse_amount(&record.cost).map_err(with_line)?;
        let stock = match record.stock.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(s.parse::<i32>().ok().filter(|v| *v >= 0).ok_or_else(|| {
                AppError::ValidationError(format!("Row {line}: invalid stock {s:?}"))
            })?),
        };
        rows.push(MenuCsvRow {
            category,
            name,
            price,
            cost,
            stock,
        });
    }
    Ok(rows)
}

pub(crate) async fn find_item<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<items::Model> {
    items::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Menu item {id} not found")))
}

async fn ensure_unique_item(
    pool: &DatabaseConnection,
    category: &str,
    name: &str,
    excluding: Option<i64>,
) -> AppResult<()> {
    let mut select = items::Entity::find()
        .filter(items::Column::Category.eq(category))
        .filter(items::Column::Name.eq(name));
    if let Some(id) = excluding {
        select = select.filter(items::Column::Id.ne(id));
    }
    if select.count(pool).await? > 0 {
        return Err(AppError::ValidationError(format!(
            "'{name}' already exists in {category}"
        )));
    }
    Ok(())
}

async fn ensure_unique_topping(
    pool: &DatabaseConnection,
    name: &str,
    excluding: Option<i64>,
) -> AppResult<()> {
    let mut select = toppings::Entity::find().filter(toppings::Column::Name.eq(name));
    if let Some(id) = excluding {
        select = select.filter(toppings::Column::Id.ne(id));
    }
    if select.count(pool).await? > 0 {
        return Err(AppError::ValidationError(format!(
            "Topping '{name}' already exists"
        )));
    }
    Ok(())
}

fn required_text(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn non_negative(field: &str, value: i64) -> AppResult<()> {
    if value < 0 {
        return Err(AppError::ValidationError(format!(
            "{field} must not be negative"
        )));
    }
    Ok(())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::test_db;

    async fn service() -> MenuService {
        MenuService::new(test_db().await, KioskConfig::default())
    }

    fn new_item(category: &str, name: &str, stock: Option<i32>) -> CreateMenuItemRequest {
        CreateMenuItemRequest {
            category: category.to_string(),
            name: name.to_string(),
            description: None,
            price: 9000,
            cost: 2500,
            stock,
            min_stock: None,
        }
    }

    #[tokio::test]
    async fn test_seeded_menu() {
        let svc = service().await;
        let categories = svc.list_categories().await.unwrap();
        assert_eq!(categories, vec!["Maggi", "Momos", "Sandwich"]);

        let maggi = svc
            .list_items(&MenuQuery {
                category: Some("Maggi".into()),
                available_only: Some(true),
            })
            .await
            .unwrap();
        assert_eq!(maggi.len(), 4);
        assert!(maggi.iter().all(|i| i.accepts_toppings));

        let toppings = svc.list_toppings(true).await.unwrap();
        assert_eq!(toppings.len(), 4);
    }

    #[tokio::test]
    async fn test_create_item_validation() {
        let svc = service().await;
        let created = svc.create_item(new_item("Momos", "Paneer Half", Some(10))).await.unwrap();
        assert_eq!(created.min_stock, 5);
        assert!(!created.accepts_toppings);

        // 同类目重名
        assert!(svc.create_item(new_item("Momos", "Paneer Half", None)).await.is_err());
        // 不同类目允许同名
        assert!(svc.create_item(new_item("Rolls", "Paneer Half", None)).await.is_ok());

        assert!(svc.create_item(new_item("", "X", None)).await.is_err());
        let mut negative = new_item("Momos", "Bad", None);
        negative.price = -1;
        assert!(svc.create_item(negative).await.is_err());
    }

    #[tokio::test]
    async fn test_restock_and_low_stock() {
        let svc = service().await;
        let item = svc.create_item(new_item("Momos", "Paneer Half", Some(3))).await.unwrap();

        let low = svc.low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, item.id);

        let restocked = svc.restock(item.id, 10).await.unwrap();
        assert_eq!(restocked.stock, Some(13));
        assert!(svc.low_stock().await.unwrap().is_empty());

        assert!(svc.restock(item.id, -14).await.is_err());
        assert_eq!(svc.get_item(item.id).await.unwrap().stock, Some(13));
        assert_eq!(svc.restock(item.id, -13).await.unwrap().stock, Some(0));
    }

    #[tokio::test]
    async fn test_restock_extreme_deltas_keep_stock_in_range() {
        let svc = service().await;
        let item = svc.create_item(new_item("Momos", "Paneer Half", Some(3))).await.unwrap();

        assert!(matches!(
            svc.restock(item.id, i32::MIN).await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(svc.get_item(item.id).await.unwrap().stock, Some(3));

        assert!(matches!(
            svc.restock(item.id, i32::MAX).await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(svc.get_item(item.id).await.unwrap().stock, Some(3));

        let topped = svc.restock(item.id, i32::MAX - 3).await.unwrap();
        assert_eq!(topped.stock, Some(i32::MAX));
    }

    #[tokio::test]
    async fn test_restock_untracked_item() {
        let svc = service().await;
        let item = svc.create_item(new_item("Momos", "Paneer Half", None)).await.unwrap();
        assert!(svc.restock(item.id, -1).await.is_err());
        assert_eq!(svc.restock(item.id, 8).await.unwrap().stock, Some(8));
    }

    #[tokio::test]
    async fn test_soft_disable() {
        let svc = service().await;
        let item = svc.create_item(new_item("Momos", "Paneer Half", None)).await.unwrap();
        svc.set_availability(item.id, false).await.unwrap();

        let available = svc
            .list_items(&MenuQuery {
                category: Some("Momos".into()),
                available_only: Some(true),
            })
            .await
            .unwrap();
        assert!(available.iter().all(|i| i.id != item.id));
        assert!(!svc.get_item(item.id).await.unwrap().is_available);
    }

    #[tokio::test]
    async fn test_update_item_and_untrack() {
        let svc = service().await;
        let item = svc.create_item(new_item("Momos", "Paneer Half", Some(4))).await.unwrap();
        let updated = svc
            .update_item(
                item.id,
                UpdateMenuItemRequest {
                    price: Some(9500),
                    untrack_stock: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, 9500);
        assert_eq!(updated.stock, None);
        assert!(!updated.low_stock);
    }

    #[tokio::test]
    async fn test_toppings_crud() {
        let svc = service().await;
        let t = svc
            .create_topping(CreateToppingRequest {
                name: "Mayo".into(),
                price: 1000,
            })
            .await
            .unwrap();
        assert!(svc
            .create_topping(CreateToppingRequest {
                name: "Mayo".into(),
                price: 500,
            })
            .await
            .is_err());

        let updated = svc
            .update_topping(
                t.id,
                UpdateToppingRequest {
                    is_available: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_available);
        assert_eq!(svc.list_toppings(true).await.unwrap().len(), 4);
        assert_eq!(svc.list_toppings(false).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_import_csv_upserts() {
        let svc = service().await;
        let csv = "category,item,price,cost,stock\n\
                   Maggi,Plain Maggi,45,12,\n\
                   Rolls,Paneer Roll,80.50,30,25\n";
        let result = svc.import_csv(csv).await.unwrap();
        assert_eq!(result, CsvImportResult { created: 1, updated: 1 });

        let maggi = svc
            .list_items(&MenuQuery {
                category: Some("Maggi".into()),
                available_only: None,
            })
            .await
            .unwrap();
        let plain = maggi.iter().find(|i| i.name == "Plain Maggi").unwrap();
        assert_eq!(plain.price, 4500);
        assert_eq!(plain.cost, 1200);
        assert_eq!(plain.stock, None);

        let rolls = svc
            .list_items(&MenuQuery {
                category: Some("Rolls".into()),
                available_only: None,
            })
            .await
            .unwrap();
        assert_eq!(rolls[0].price, 8050);
        assert_eq!(rolls[0].stock, Some(25));
    }

    #[tokio::test]
    async fn test_import_csv_is_all_or_nothing() {
        let svc = service().await;
        let csv = "category,item,price,cost\n\
                   Rolls,Paneer Roll,80,30\n\
                   Rolls,Egg Roll,abc,20\n";
        let err = svc.import_csv(csv).await.unwrap_err();
        assert!(err.to_string().contains("Row 3"));
        assert!(svc.list_categories().await.unwrap().iter().all(|c| c != "Rolls"));
    }
}
