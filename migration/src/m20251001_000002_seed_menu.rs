use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 初始菜单与小料（金额单位: paise，100 = ₹1）
/// - Momos 不支持小料
/// - Sandwich / Maggi 可加小料
/// 库存为 NULL 表示不跟踪库存
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        let backend = manager.get_database_backend();

        let menu_sql = r#"
INSERT INTO menu_items (category, name, price, cost, stock, min_stock, is_available, created_at, updated_at)
VALUES
 ('Momos', 'Veg Half (6 pcs)', 8000, 1000, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Momos', 'Veg Full (12 pcs)', 15000, 2000, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Momos', 'Chicken Half (6 pcs)', 10000, 1700, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Momos', 'Chicken Full (12 pcs)', 19000, 3400, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Sandwich', 'Veg Sandwich', 6000, 1500, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Sandwich', 'Cheese Veg Sandwich', 8000, 2500, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Sandwich', 'Chicken Sandwich', 10000, 3000, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Maggi', 'Plain Maggi', 4000, 1000, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Maggi', 'Veg Maggi', 6000, 2000, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Maggi', 'Cheese Maggi', 7000, 2500, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Maggi', 'Chicken Maggi', 9000, 3000, NULL, 5, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
ON CONFLICT (category, name) DO NOTHING;
"#;
        conn.execute(Statement::from_string(backend, menu_sql.to_string()))
            .await?;

        let topping_sql = r#"
INSERT INTO toppings (name, price, is_available, created_at, updated_at)
VALUES
 ('Extra Cheese', 2000, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Masala', 1000, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Butter', 1000, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
 ('Egg', 1500, TRUE, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'), strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
ON CONFLICT (name) DO NOTHING;
"#;
        conn.execute(Statement::from_string(backend, topping_sql.to_string()))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();
        let backend = manager.get_database_backend();
        conn.execute(Statement::from_string(
            backend,
            "DELETE FROM toppings WHERE name IN ('Extra Cheese', 'Masala', 'Butter', 'Egg')"
                .to_string(),
        ))
        .await?;
        conn.execute(Statement::from_string(
            backend,
            "DELETE FROM menu_items WHERE category IN ('Momos', 'Sandwich', 'Maggi')".to_string(),
        ))
        .await?;
        Ok(())
    }
}
