use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::{self, DbPool, OrmConn},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        categories::{
            ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories,
            Model as CategoryModel,
        },
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    models::{
        CartItem, CartLine, Category, Order, OrderItem, OrderStatus, Product, User, WishlistItem,
        WishlistLine,
    },
};

use super::{
    NewCategory, NewOrder, NewOrderItem, NewProduct, NewUser, OrderFilter, ProductChanges,
    ProductFilter, Storage,
};

/// Relational backend. sea-orm handles single-table CRUD; joins and upserts go
/// through raw sqlx on the same pool.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: DbPool,
    orm: OrmConn,
}

impl PostgresStorage {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = db::create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: DbPool) -> Self {
        let orm = db::orm_from_pool(&pool);
        Self { pool, orm }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        db::run_migrations(&self.orm).await
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct CartProductRow {
    cart_id: Uuid,
    cart_user_id: Uuid,
    quantity: i32,
    #[sqlx(flatten)]
    product: Product,
}

#[derive(FromRow)]
struct WishlistProductRow {
    wishlist_id: Uuid,
    wishlist_user_id: Uuid,
    #[sqlx(flatten)]
    product: Product,
}

#[async_trait]
impl Storage for PostgresStorage {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Users::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(user_from_entity)
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Users::find()
            .filter(UserCol::Email.eq(email))
            .one(&self.orm)
            .await?
            .map(user_from_entity)
            .transpose()
    }

    async fn create_user(&self, new: NewUser) -> AppResult<User> {
        let active = UserActive {
            id: Set(Uuid::new_v4()),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            role: Set(new.role.as_str().to_string()),
            created_at: NotSet,
        };
        match active.insert(&self.orm).await {
            Ok(user) => user_from_entity(user),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AppError::BadRequest("Email is already taken".into()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = Categories::find()
            .order_by_asc(CategoryCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(category_from_entity)
            .collect();
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> AppResult<Option<Category>> {
        Ok(Categories::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(category_from_entity))
    }

    async fn create_category(&self, new: NewCategory) -> AppResult<Category> {
        let category = CategoryActive {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            icon: Set(new.icon),
            color: Set(new.color),
            description: Set(new.description),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(category_from_entity(category))
    }

    async fn list_products(&self, filter: &ProductFilter) -> AppResult<(Vec<Product>, i64)> {
        let mut condition = Condition::all();

        if let Some(category_id) = filter.category_id {
            condition = condition.add(ProdCol::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.as_ref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(ProdCol::Name).ilike(pattern.clone()))
                    .add(Expr::col(ProdCol::Description).ilike(pattern.clone()))
                    .add(Expr::cust_with_values(
                        "EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ?)",
                        [pattern],
                    )),
            );
        }
        if let Some(featured) = filter.featured {
            condition = condition.add(ProdCol::Featured.eq(featured));
        }
        if let Some(flash_deal) = filter.flash_deal {
            condition = condition.add(ProdCol::FlashDeal.eq(flash_deal));
        }

        let finder = Products::find()
            .filter(condition)
            .order_by_asc(ProdCol::CreatedAt)
            .order_by_asc(ProdCol::Id);

        let total = finder.clone().count(&self.orm).await? as i64;

        let mut page = finder.offset(filter.offset);
        if let Some(limit) = filter.limit {
            page = page.limit(limit);
        }
        let items = page
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();

        Ok((items, total))
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(Products::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(product_from_entity))
    }

    async fn create_product(&self, new: NewProduct) -> AppResult<Product> {
        let product = ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            description: Set(new.description),
            price: Set(new.price),
            original_price: Set(new.original_price),
            image: Set(new.image),
            images: Set(new.images),
            category_id: Set(new.category_id),
            rating: Set(new.rating),
            review_count: Set(new.review_count),
            in_stock: Set(new.in_stock),
            featured: Set(new.featured),
            flash_deal: Set(new.flash_deal),
            discount_percentage: Set(new.discount_percentage),
            delivery_time: Set(new.delivery_time),
            tags: Set(new.tags),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(product_from_entity(product))
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> AppResult<Option<Product>> {
        let Some(existing) = Products::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };

        let mut active: ProductActive = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(original_price) = changes.original_price {
            active.original_price = Set(Some(original_price));
        }
        if let Some(in_stock) = changes.in_stock {
            active.in_stock = Set(in_stock);
        }
        if let Some(featured) = changes.featured {
            active.featured = Set(featured);
        }
        if let Some(flash_deal) = changes.flash_deal {
            active.flash_deal = Set(flash_deal);
        }
        if let Some(discount) = changes.discount_percentage {
            active.discount_percentage = Set(discount);
        }

        let product = active.update(&self.orm).await?;
        Ok(Some(product_from_entity(product)))
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<bool> {
        let result = Products::delete_by_id(id).exec(&self.orm).await?;
        Ok(result.rows_affected > 0)
    }

    async fn get_cart_items(&self, user_id: Uuid) -> AppResult<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartProductRow>(
            r#"
            SELECT ci.id AS cart_id, ci.user_id AS cart_user_id, ci.quantity, p.*
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CartLine {
                id: row.cart_id,
                user_id: row.cart_user_id,
                product_id: row.product.id,
                quantity: row.quantity,
                product: row.product,
            })
            .collect())
    }

    async fn add_to_cart(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartItem> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity::BIGINT + EXCLUDED.quantity <= 2147483647
            RETURNING id, user_id, product_id, quantity, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;
        // No row back means the conflicting line would have overflowed.
        item.ok_or_else(|| AppError::BadRequest("quantity is too large".into()))
    }

    async fn update_cart_item(
        &self,
        user_id: Uuid,
        id: Uuid,
        quantity: i32,
    ) -> AppResult<Option<CartItem>> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items
            SET quantity = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, product_id, quantity, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn remove_from_cart(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = CartItems::delete_many()
            .filter(CartCol::Id.eq(id))
            .filter(CartCol::UserId.eq(user_id))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn clear_cart(&self, user_id: Uuid) -> AppResult<u64> {
        let result = CartItems::delete_many()
            .filter(CartCol::UserId.eq(user_id))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected)
    }

    async fn get_wishlist_items(&self, user_id: Uuid) -> AppResult<Vec<WishlistLine>> {
        let rows = sqlx::query_as::<_, WishlistProductRow>(
            r#"
            SELECT wi.id AS wishlist_id, wi.user_id AS wishlist_user_id, p.*
            FROM wishlist_items wi
            JOIN products p ON p.id = wi.product_id
            WHERE wi.user_id = $1
            ORDER BY wi.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| WishlistLine {
                id: row.wishlist_id,
                user_id: row.wishlist_user_id,
                product_id: row.product.id,
                product: row.product,
            })
            .collect())
    }

    async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> AppResult<WishlistItem> {
        let inserted = sqlx::query_as::<_, WishlistItem>(
            r#"
            INSERT INTO wishlist_items (id, user_id, product_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO NOTHING
            RETURNING id, user_id, product_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(item) = inserted {
            return Ok(item);
        }

        let existing = sqlx::query_as::<_, WishlistItem>(
            "SELECT id, user_id, product_id, created_at FROM wishlist_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(existing)
    }

    async fn remove_from_wishlist(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }

        Orders::find()
            .filter(condition)
            .order_by_desc(OrderCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect()
    }

    async fn get_order(&self, id: Uuid) -> AppResult<Option<Order>> {
        Orders::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn get_order_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        Ok(OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_item_from_entity)
            .collect())
    }

    async fn place_order(
        &self,
        new: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> AppResult<(Order, Vec<OrderItem>)> {
        let txn = self.orm.begin().await?;

        let order = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(new.user_id),
            status: Set(OrderStatus::Confirmed.as_str().to_string()),
            total_amount: Set(new.total_amount),
            delivery_address: Set(new.delivery_address),
            estimated_delivery: Set(new.estimated_delivery),
            payment_method: Set(new.payment_method),
            transaction_id: Set(new.transaction_id),
            tracking_id: Set(new.tracking_id),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let mut order_items = Vec::with_capacity(items.len());
        for item in items {
            let row = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(item.price),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
            order_items.push(order_item_from_entity(row));
        }

        CartItems::delete_many()
            .filter(CartCol::UserId.eq(new.user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok((order_from_entity(order)?, order_items))
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> AppResult<Option<Order>> {
        let updated = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(to.as_str()))
            .col_expr(OrderCol::UpdatedAt, Expr::current_timestamp().into())
            .filter(OrderCol::Id.eq(id))
            .filter(OrderCol::Status.eq(from.as_str()))
            .exec_with_returning(&self.orm)
            .await?;

        updated.into_iter().next().map(order_from_entity).transpose()
    }

    async fn record_payment(
        &self,
        id: Uuid,
        payment_method: &str,
        transaction_id: &str,
    ) -> AppResult<Option<Order>> {
        let Some(order) = Orders::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };

        let mut active: OrderActive = order.into();
        active.payment_method = Set(payment_method.to_string());
        active.transaction_id = Set(Some(transaction_id.to_string()));
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&self.orm).await?;
        order_from_entity(order).map(Some)
    }
}

/// Escapes `LIKE` wildcards so the search text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn user_from_entity(model: UserModel) -> AppResult<User> {
    let role = model
        .role
        .parse()
        .map_err(|err: String| AppError::Internal(anyhow::anyhow!(err)))?;
    Ok(User {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        first_name: model.first_name,
        last_name: model.last_name,
        role,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        icon: model.icon,
        color: model.color,
        description: model.description,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        original_price: model.original_price,
        image: model.image,
        images: model.images,
        category_id: model.category_id,
        rating: model.rating,
        review_count: model.review_count,
        in_stock: model.in_stock,
        featured: model.featured,
        flash_deal: model.flash_deal,
        discount_percentage: model.discount_percentage,
        delivery_time: model.delivery_time,
        tags: model.tags,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = model
        .status
        .parse()
        .map_err(|err: String| AppError::Internal(anyhow::anyhow!(err)))?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        status,
        total_amount: model.total_amount,
        delivery_address: model.delivery_address,
        estimated_delivery: model.estimated_delivery,
        payment_method: model.payment_method,
        transaction_id: model.transaction_id,
        tracking_id: model.tracking_id,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
