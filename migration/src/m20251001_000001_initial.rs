use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    FullName,
    Role,
    Pages,
    IsActive,
    LastLoginAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MenuItems {
    Table,
    Id,
    Category,
    Name,
    Description,
    Price,
    Cost,
    Stock,
    MinStock,
    IsAvailable,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Toppings {
    Table,
    Id,
    Name,
    Price,
    IsAvailable,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    Name,
    Phone,
    Email,
    Address,
    CreditBalance,
    TotalSpent,
    OrderCount,
    LoyaltyPoints,
    IsActive,
    JoinedAt,
    LastOrderAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    CustomerId,
    CustomerName,
    TotalSale,
    Tax,
    AmountDue,
    TotalCost,
    Profit,
    PaymentMode,
    StaffId,
    StaffUsername,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OrderLines {
    Table,
    Id,
    OrderId,
    MenuItemId,
    Category,
    ItemName,
    UnitPrice,
    UnitCost,
    Quantity,
    Toppings,
    ToppingUnitTotal,
    LineTotal,
    LineCost,
}

#[derive(DeriveIden)]
enum CreditEntries {
    Table,
    Id,
    CustomerId,
    Kind,
    Amount,
    OrderId,
    Note,
    StaffId,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 用户表
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::FullName).string().null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(ColumnDef::new(Users::Pages).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::LastLoginAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        // 菜单表
        manager
            .create_table(
                Table::create()
                    .table(MenuItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MenuItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MenuItems::Category).string().not_null())
                    .col(ColumnDef::new(MenuItems::Name).string().not_null())
                    .col(ColumnDef::new(MenuItems::Description).string().null())
                    .col(ColumnDef::new(MenuItems::Price).big_integer().not_null())
                    .col(ColumnDef::new(MenuItems::Cost).big_integer().not_null())
                    .col(ColumnDef::new(MenuItems::Stock).integer().null())
                    .col(
                        ColumnDef::new(MenuItems::MinStock)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    .col(
                        ColumnDef::new(MenuItems::IsAvailable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(MenuItems::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(MenuItems::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_menu_items_category_name")
                    .table(MenuItems::Table)
                    .col(MenuItems::Category)
                    .col(MenuItems::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 小料表
        manager
            .create_table(
                Table::create()
                    .table(Toppings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Toppings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Toppings::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Toppings::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Toppings::IsAvailable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Toppings::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Toppings::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        // 顾客表
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::Name).string().not_null())
                    .col(ColumnDef::new(Customers::Phone).string().null().unique_key())
                    .col(ColumnDef::new(Customers::Email).string().null())
                    .col(ColumnDef::new(Customers::Address).string().null())
                    .col(
                        ColumnDef::new(Customers::CreditBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::TotalSpent)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::OrderCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::LoyaltyPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Customers::JoinedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Customers::LastOrderAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Customers::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Customers::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        // 订单表（提交后不可修改）
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::CustomerId).integer().null())
                    .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                    .col(ColumnDef::new(Orders::TotalSale).big_integer().not_null())
                    .col(ColumnDef::new(Orders::Tax).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Orders::AmountDue).big_integer().not_null())
                    .col(ColumnDef::new(Orders::TotalCost).big_integer().not_null())
                    .col(ColumnDef::new(Orders::Profit).big_integer().not_null())
                    .col(ColumnDef::new(Orders::PaymentMode).string().not_null())
                    .col(ColumnDef::new(Orders::StaffId).integer().not_null())
                    .col(ColumnDef::new(Orders::StaffUsername).string().not_null())
                    .col(ColumnDef::new(Orders::Notes).string().null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_customer")
                            .from(Orders::Table, Orders::CustomerId)
                            .to(Customers::Table, Customers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_staff")
                            .from(Orders::Table, Orders::StaffId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_created_at")
                    .table(Orders::Table)
                    .col(Orders::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_customer")
                    .table(Orders::Table)
                    .col(Orders::CustomerId)
                    .to_owned(),
            )
            .await?;

        // 订单明细
        manager
            .create_table(
                Table::create()
                    .table(OrderLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderLines::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderLines::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderLines::MenuItemId).integer().not_null())
                    .col(ColumnDef::new(OrderLines::Category).string().not_null())
                    .col(ColumnDef::new(OrderLines::ItemName).string().not_null())
                    .col(ColumnDef::new(OrderLines::UnitPrice).big_integer().not_null())
                    .col(ColumnDef::new(OrderLines::UnitCost).big_integer().not_null())
                    .col(ColumnDef::new(OrderLines::Quantity).integer().not_null())
                    .col(ColumnDef::new(OrderLines::Toppings).string().not_null().default(""))
                    .col(
                        ColumnDef::new(OrderLines::ToppingUnitTotal)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(OrderLines::LineTotal).big_integer().not_null())
                    .col(ColumnDef::new(OrderLines::LineCost).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_lines_order")
                            .from(OrderLines::Table, OrderLines::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_lines_menu_item")
                            .from(OrderLines::Table, OrderLines::MenuItemId)
                            .to(MenuItems::Table, MenuItems::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_lines_order")
                    .table(OrderLines::Table)
                    .col(OrderLines::OrderId)
                    .to_owned(),
            )
            .await?;

        // 赊账流水
        manager
            .create_table(
                Table::create()
                    .table(CreditEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditEntries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CreditEntries::CustomerId).integer().not_null())
                    .col(ColumnDef::new(CreditEntries::Kind).string().not_null())
                    .col(ColumnDef::new(CreditEntries::Amount).big_integer().not_null())
                    .col(ColumnDef::new(CreditEntries::OrderId).integer().null())
                    .col(ColumnDef::new(CreditEntries::Note).string().null())
                    .col(ColumnDef::new(CreditEntries::StaffId).integer().not_null())
                    .col(
                        ColumnDef::new(CreditEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_entries_customer")
                            .from(CreditEntries::Table, CreditEntries::CustomerId)
                            .to(Customers::Table, Customers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_credit_entries_order")
                            .from(CreditEntries::Table, CreditEntries::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_credit_entries_customer")
                    .table(CreditEntries::Table)
                    .col(CreditEntries::CustomerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：流水 -> 明细 -> 订单 -> 其它
        manager
            .drop_table(Table::drop().if_exists().table(CreditEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(OrderLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Customers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Toppings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(MenuItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
