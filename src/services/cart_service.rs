use crate::config::KioskConfig;
use crate::entities::{menu_item_entity as items, topping_entity as toppings};
use crate::error::{AppError, AppResult};
use crate::models::{AddCartLineRequest, Cart, CartEntry, CartLineView, CartView};
use crate::pricing::{OrderTotals, PricedLine};
use crate::services::menu_service::find_item;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 每位登录员工一个购物车，按用户 ID 存放在内存中
#[derive(Clone)]
pub struct CartService {
    pool: DatabaseConnection,
    kiosk: KioskConfig,
    carts: Arc<RwLock<HashMap<i64, Cart>>>,
}

/// 按当前菜单定价后的购物车行
#[derive(Debug, Clone)]
pub(crate) struct ResolvedLine {
    pub entry: CartEntry,
    pub item: items::Model,
    pub toppings: Vec<toppings::Model>,
    pub priced: PricedLine,
}

impl ResolvedLine {
    pub fn is_orderable(&self) -> bool {
        self.item.is_available && self.toppings.iter().all(|t| t.is_available)
    }

    pub fn topping_names(&self) -> Vec<String> {
        self.toppings.iter().map(|t| t.name.clone()).collect()
    }

    fn view(&self) -> CartLineView {
        CartLineView {
            line_id: self.entry.line_id,
            menu_item_id: self.item.id,
            category: self.item.category.clone(),
            item_name: self.item.name.clone(),
            unit_price: self.priced.unit_price,
            quantity: self.priced.quantity,
            toppings: self.topping_names(),
            topping_unit_total: self.priced.topping_unit_total,
            line_total: self.priced.line_total,
            available: self.is_orderable(),
        }
    }
}

impl CartService {
    pub fn new(pool: DatabaseConnection, kiosk: KioskConfig) -> Self {
        Self {
            pool,
            kiosk,
            carts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn add_line(&self, user_id: i64, req: AddCartLineRequest) -> AppResult<CartView> {
        if req.quantity < 1 {
            return Err(AppError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let item = find_item(&self.pool, req.menu_item_id).await?;
        if !item.is_available {
            return Err(AppError::ValidationError(format!(
                "{} is currently unavailable",
                item.name
            )));
        }
        let topping_models = load_toppings(&self.pool, &req.topping_ids).await?;
        check_toppings(&self.kiosk, &item, &topping_models)?;

        {
            let mut carts = self.carts.write().await;
            let cart = carts.entry(user_id).or_default();
            let requested = cart
                .quantity_of(item.id)
                .and_then(|q| q.checked_add(req.quantity))
                .ok_or_else(|| {
                    AppError::ValidationError(format!("Quantity too large for {}", item.name))
                })?;
            if !item.has_stock_for(requested) {
                return Err(AppError::ValidationError(format!(
                    "Only {} left for {}",
                    item.stock.unwrap_or(0),
                    item.name
                )));
            }
            cart.entries.push(CartEntry {
                line_id: Uuid::new_v4(),
                menu_item_id: item.id,
                quantity: req.quantity,
                topping_ids: req.topping_ids,
            });
        }

        self.view(user_id).await
    }

    pub async fn remove_line(&self, user_id: i64, line_id: Uuid) -> AppResult<CartView> {
        {
            let mut carts = self.carts.write().await;
            let cart = carts.entry(user_id).or_default();
            let before = cart.entries.len();
            cart.entries.retain(|e| e.line_id != line_id);
            if cart.entries.len() == before {
                return Err(AppError::NotFound("Cart line not found".to_string()));
            }
        }
        self.view(user_id).await
    }

    pub async fn clear(&self, user_id: i64) {
        self.carts.write().await.remove(&user_id);
    }

    /// 下单成功后只移除已提交的行，提交期间新加入的行保留
    pub async fn remove_submitted(&self, user_id: i64, submitted: &[Uuid]) {
        let mut carts = self.carts.write().await;
        if let Some(cart) = carts.get_mut(&user_id) {
            cart.entries.retain(|e| !submitted.contains(&e.line_id));
            if cart.is_empty() {
                carts.remove(&user_id);
            }
        }
    }

    pub async fn snapshot(&self, user_id: i64) -> Cart {
        self.carts
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn view(&self, user_id: i64) -> AppResult<CartView> {
        let cart = self.snapshot(user_id).await;
        let resolved = resolve_lines(&self.pool, &cart.entries).await?;
        let totals = OrderTotals::from_lines(
            resolved.iter().map(|l| &l.priced),
            self.kiosk.tax_rate_bp,
        );
        Ok(CartView {
            lines: resolved.iter().map(ResolvedLine::view).collect(),
            totals,
        })
    }
}

/// 按当前菜单给购物车行定价（价格取数据库中的最新值）
pub(crate) async fn resolve_lines<C: ConnectionTrait>(
    conn: &C,
    entries: &[CartEntry],
) -> AppResult<Vec<ResolvedLine>> {
    let item_ids: HashSet<i64> = entries.iter().map(|e| e.menu_item_id).collect();
    let topping_ids: HashSet<i64> = entries
        .iter()
        .flat_map(|e| e.topping_ids.iter().copied())
        .collect();

    let item_map: HashMap<i64, items::Model> = items::Entity::find()
        .filter(items::Column::Id.is_in(item_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();
    let topping_map: HashMap<i64, toppings::Model> = toppings::Entity::find()
        .filter(toppings::Column::Id.is_in(topping_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    entries
        .iter()
        .map(|entry| {
            let item = item_map.get(&entry.menu_item_id).cloned().ok_or_else(|| {
                AppError::NotFound(format!("Menu item {} not found", entry.menu_item_id))
            })?;
            let line_toppings = entry
                .topping_ids
                .iter()
                .map(|id| {
                    topping_map
                        .get(id)
                        .cloned()
                        .ok_or_else(|| AppError::NotFound(format!("Topping {id} not found")))
                })
                .collect::<AppResult<Vec<_>>>()?;
            let topping_prices: Vec<i64> = line_toppings.iter().map(|t| t.price).collect();
            let priced = PricedLine::new(item.price, item.cost, &topping_prices, entry.quantity);
            Ok(ResolvedLine {
                entry: entry.clone(),
                item,
                toppings: line_toppings,
                priced,
            })
        })
        .collect()
}

async fn load_toppings<C: ConnectionTrait>(
    conn: &C,
    topping_ids: &[i64],
) -> AppResult<Vec<toppings::Model>> {
    let unique: HashSet<i64> = topping_ids.iter().copied().collect();
    if unique.len() != topping_ids.len() {
        return Err(AppError::ValidationError(
            "The same topping cannot be added twice".to_string(),
        ));
    }
    if topping_ids.is_empty() {
        return Ok(Vec::new());
    }

    let found: HashMap<i64, toppings::Model> = toppings::Entity::find()
        .filter(toppings::Column::Id.is_in(unique))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    topping_ids
        .iter()
        .map(|id| {
            found
                .get(id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Topping {id} not found")))
        })
        .collect()
}

/// 小料必须可用，且菜品类目允许加小料
pub(crate) fn check_toppings(
    kiosk: &KioskConfig,
    item: &items::Model,
    line_toppings: &[toppings::Model],
) -> AppResult<()> {
    if line_toppings.is_empty() {
        return Ok(());
    }
    if !kiosk.allows_toppings(&item.category) {
        return Err(AppError::ValidationError(format!(
            "{} items do not take toppings",
            item.category
        )));
    }
    if let Some(t) = line_toppings.iter().find(|t| !t.is_available) {
        return Err(AppError::ValidationError(format!(
            "Topping {} is currently unavailable",
            t.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::test_db;
    use crate::models::{CreateMenuItemRequest, MenuQuery, UpdateToppingRequest};
    use crate::services::MenuService;

    struct Fixture {
        cart: CartService,
        menu: MenuService,
    }

    async fn fixture() -> Fixture {
        let db = test_db().await;
        Fixture {
            cart: CartService::new(db.clone(), KioskConfig::default()),
            menu: MenuService::new(db, KioskConfig::default()),
        }
    }

    async fn item_id(menu: &MenuService, category: &str, name: &str) -> i64 {
        menu.list_items(&MenuQuery {
            category: Some(category.into()),
            available_only: None,
        })
        .await
        .unwrap()
        .into_iter()
        .find(|i| i.name == name)
        .unwrap()
        .id
    }

    async fn topping_id(menu: &MenuService, name: &str) -> i64 {
        menu.list_toppings(false)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.name == name)
            .unwrap()
            .id
    }

    fn add(menu_item_id: i64, quantity: i32, topping_ids: Vec<i64>) -> AddCartLineRequest {
        AddCartLineRequest {
            menu_item_id,
            quantity,
            topping_ids,
        }
    }

    #[tokio::test]
    async fn test_add_lines_and_totals() {
        let f = fixture().await;
        let cheese_maggi = item_id(&f.menu, "Maggi", "Cheese Maggi").await;
        let veg_momos = item_id(&f.menu, "Momos", "Veg Half (6 pcs)").await;
        let extra_cheese = topping_id(&f.menu, "Extra Cheese").await;
        let egg = topping_id(&f.menu, "Egg").await;

        f.cart
            .add_line(1, add(cheese_maggi, 2, vec![extra_cheese, egg]))
            .await
            .unwrap();
        let view = f.cart.add_line(1, add(veg_momos, 1, vec![])).await.unwrap();

        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.lines[0].line_total, (7000 + 2000 + 1500) * 2);
        assert_eq!(view.lines[0].toppings, vec!["Extra Cheese", "Egg"]);
        assert_eq!(view.totals.total_sale, 21000 + 8000);
        assert_eq!(view.totals.total_cost, 2500 * 2 + 1000);
        assert!(view.lines.iter().all(|l| l.available));
    }

    #[tokio::test]
    async fn test_carts_are_per_user() {
        let f = fixture().await;
        let plain = item_id(&f.menu, "Maggi", "Plain Maggi").await;
        f.cart.add_line(1, add(plain, 1, vec![])).await.unwrap();

        assert!(f.cart.view(2).await.unwrap().lines.is_empty());
        assert_eq!(f.cart.view(1).await.unwrap().lines.len(), 1);
    }

    #[tokio::test]
    async fn test_add_line_rejections() {
        let f = fixture().await;
        let momos = item_id(&f.menu, "Momos", "Veg Half (6 pcs)").await;
        let maggi = item_id(&f.menu, "Maggi", "Plain Maggi").await;
        let masala = topping_id(&f.menu, "Masala").await;

        // 数量为 0
        assert!(f.cart.add_line(1, add(maggi, 0, vec![])).await.is_err());
        // Momos 不能加小料
        assert!(f.cart.add_line(1, add(momos, 1, vec![masala])).await.is_err());
        // 重复小料
        assert!(f.cart.add_line(1, add(maggi, 1, vec![masala, masala])).await.is_err());
        // 不存在的菜品和小料
        assert!(matches!(
            f.cart.add_line(1, add(9999, 1, vec![])).await,
            Err(AppError::NotFound(_))
        ));
        assert!(f.cart.add_line(1, add(maggi, 1, vec![9999])).await.is_err());

        // 已下架
        f.menu.set_availability(maggi, false).await.unwrap();
        assert!(f.cart.add_line(1, add(maggi, 1, vec![])).await.is_err());

        f.menu
            .update_topping(
                masala,
                UpdateToppingRequest {
                    is_available: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let veg_maggi = item_id(&f.menu, "Maggi", "Veg Maggi").await;
        assert!(f.cart.add_line(1, add(veg_maggi, 1, vec![masala])).await.is_err());

        assert!(f.cart.view(1).await.unwrap().lines.is_empty());
    }

    #[tokio::test]
    async fn test_cart_quantity_respects_stock() {
        let f = fixture().await;
        let item = f
            .menu
            .create_item(CreateMenuItemRequest {
                category: "Momos".into(),
                name: "Paneer Half".into(),
                description: None,
                price: 9000,
                cost: 2000,
                stock: Some(3),
                min_stock: None,
            })
            .await
            .unwrap();

        f.cart.add_line(1, add(item.id, 2, vec![])).await.unwrap();
        assert!(f.cart.add_line(1, add(item.id, 2, vec![])).await.is_err());
        f.cart.add_line(1, add(item.id, 1, vec![])).await.unwrap();
    }

    #[tokio::test]
    async fn test_huge_quantities_on_untracked_item_are_rejected() {
        let f = fixture().await;
        let maggi = item_id(&f.menu, "Maggi", "Plain Maggi").await;

        f.cart.add_line(1, add(maggi, i32::MAX, vec![])).await.unwrap();
        assert!(matches!(
            f.cart.add_line(1, add(maggi, 1, vec![])).await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(f.cart.view(1).await.unwrap().lines.len(), 1);
    }

    #[test]
    fn test_quantity_of_reports_overflow() {
        let line = |quantity| CartEntry {
            line_id: Uuid::new_v4(),
            menu_item_id: 7,
            quantity,
            topping_ids: vec![],
        };
        let mut cart = Cart::default();
        assert_eq!(cart.quantity_of(7), Some(0));
        cart.entries.push(line(i32::MAX - 1));
        assert_eq!(cart.quantity_of(7), Some(i32::MAX - 1));
        cart.entries.push(line(2));
        assert_eq!(cart.quantity_of(7), None);
        assert_eq!(cart.quantity_of(8), Some(0));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let f = fixture().await;
        let plain = item_id(&f.menu, "Maggi", "Plain Maggi").await;
        f.cart.add_line(1, add(plain, 1, vec![])).await.unwrap();
        let view = f.cart.add_line(1, add(plain, 2, vec![])).await.unwrap();

        let view = f.cart.remove_line(1, view.lines[0].line_id).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity, 2);
        assert!(f.cart.remove_line(1, Uuid::new_v4()).await.is_err());

        f.cart.clear(1).await;
        assert!(f.cart.snapshot(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_view_flags_lines_that_became_unavailable() {
        let f = fixture().await;
        let plain = item_id(&f.menu, "Maggi", "Plain Maggi").await;
        f.cart.add_line(1, add(plain, 1, vec![])).await.unwrap();
        f.menu.set_availability(plain, false).await.unwrap();

        let view = f.cart.view(1).await.unwrap();
        assert!(!view.lines[0].available);
    }
}
