//! Demo catalog and accounts for local runs.

use crate::{
    models::Role,
    services::auth_service::hash_password,
    storage::{NewCategory, NewProduct, NewUser, Storage},
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "demo123";

const IMAGE_PARAMS: &str = "?ixlib=rb-4.0.3&auto=format&fit=crop&w=400&h=300";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub products: usize,
    pub users: usize,
}

struct CategorySeed {
    name: &'static str,
    icon: &'static str,
    color: &'static str,
    description: &'static str,
}

struct ProductSeed {
    name: &'static str,
    description: &'static str,
    price: i64,
    original_price: i64,
    photo: &'static str,
    category: usize,
    rating: f64,
    review_count: i32,
    featured: bool,
    flash_deal: bool,
    discount_percentage: i32,
    delivery_time: &'static str,
    tags: [&'static str; 3],
}

const CATEGORIES: [CategorySeed; 6] = [
    CategorySeed {
        name: "Electronics",
        icon: "fas fa-mobile-alt",
        color: "red",
        description: "Latest gadgets and electronics",
    },
    CategorySeed {
        name: "Fashion",
        icon: "fas fa-tshirt",
        color: "blue",
        description: "Trendy fashion and apparel",
    },
    CategorySeed {
        name: "Home",
        icon: "fas fa-home",
        color: "green",
        description: "Home and living essentials",
    },
    CategorySeed {
        name: "Sports",
        icon: "fas fa-dumbbell",
        color: "yellow",
        description: "Sports and fitness equipment",
    },
    CategorySeed {
        name: "Books",
        icon: "fas fa-book",
        color: "purple",
        description: "Books and educational materials",
    },
    CategorySeed {
        name: "Grocery",
        icon: "fas fa-apple-alt",
        color: "pink",
        description: "Fresh groceries and food items",
    },
];

const PRODUCTS: [ProductSeed; 8] = [
    ProductSeed {
        name: "Premium Wireless Headphones",
        description: "Wireless headphones with noise cancellation and rich sound.",
        price: 2999,
        original_price: 7499,
        photo: "photo-1505740420928-5e560c06d30e",
        category: 0,
        rating: 4.5,
        review_count: 2845,
        featured: true,
        flash_deal: true,
        discount_percentage: 60,
        delivery_time: "Express",
        tags: ["wireless", "premium", "noise-cancellation"],
    },
    ProductSeed {
        name: "Smart Fitness Watch",
        description: "Fitness tracker with health monitoring and smart notifications.",
        price: 8999,
        original_price: 16499,
        photo: "photo-1523275335684-37898b6baf30",
        category: 0,
        rating: 4.2,
        review_count: 1234,
        featured: true,
        flash_deal: true,
        discount_percentage: 45,
        delivery_time: "Express",
        tags: ["fitness", "smart", "health"],
    },
    ProductSeed {
        name: "Classic White Sneakers",
        description: "Leather sneakers for casual wear, available in all sizes.",
        price: 4999,
        original_price: 4999,
        photo: "photo-1549298916-b41d501d3772",
        category: 1,
        rating: 4.1,
        review_count: 892,
        featured: true,
        flash_deal: false,
        discount_percentage: 0,
        delivery_time: "Express Delivery",
        tags: ["sneakers", "leather", "casual"],
    },
    ProductSeed {
        name: "Designer Handbag",
        description: "Premium leather handbag with an elegant design.",
        price: 12999,
        original_price: 19999,
        photo: "photo-1584917865442-de89df76afd3",
        category: 1,
        rating: 4.8,
        review_count: 567,
        featured: true,
        flash_deal: false,
        discount_percentage: 35,
        delivery_time: "Express",
        tags: ["handbag", "luxury", "leather"],
    },
    ProductSeed {
        name: "Decorative Table Lamp",
        description: "LED table lamp with adjustable brightness and a USB charging port.",
        price: 2799,
        original_price: 2799,
        photo: "photo-1507473885765-e6ed057f782c",
        category: 2,
        rating: 4.6,
        review_count: 445,
        featured: true,
        flash_deal: false,
        discount_percentage: 0,
        delivery_time: "Express",
        tags: ["lamp", "led", "modern"],
    },
    ProductSeed {
        name: "Yoga Mat Set",
        description: "Non-slip yoga mat with carrying strap and exercise guide.",
        price: 1899,
        original_price: 3499,
        photo: "photo-1544367567-0f2fcb009e0b",
        category: 3,
        rating: 4.7,
        review_count: 1234,
        featured: false,
        flash_deal: true,
        discount_percentage: 46,
        delivery_time: "Express",
        tags: ["yoga", "fitness", "exercise"],
    },
    ProductSeed {
        name: "Rust Programming Handbook",
        description: "Hands-on guide to ownership, traits and async Rust.",
        price: 3999,
        original_price: 3999,
        photo: "photo-1544947950-fa07a98d237f",
        category: 4,
        rating: 4.9,
        review_count: 310,
        featured: false,
        flash_deal: false,
        discount_percentage: 0,
        delivery_time: "Standard",
        tags: ["books", "programming", "rust"],
    },
    ProductSeed {
        name: "Premium Coffee Beans",
        description: "Single origin arabica beans, 1kg pack for home brewing.",
        price: 1299,
        original_price: 1299,
        photo: "photo-1559056199-641a0ac8b55e",
        category: 5,
        rating: 5.0,
        review_count: 2134,
        featured: true,
        flash_deal: false,
        discount_percentage: 0,
        delivery_time: "Same Day",
        tags: ["coffee", "organic", "arabica"],
    },
];

/// Inserts the demo catalog and accounts. Does nothing when categories
/// already exist.
pub async fn seed_demo_data(storage: &dyn Storage) -> anyhow::Result<SeedReport> {
    if !storage.list_categories().await?.is_empty() {
        tracing::info!("catalog already present, skipping seed");
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport::default();

    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for seed in &CATEGORIES {
        let category = storage
            .create_category(NewCategory {
                name: seed.name.to_string(),
                icon: seed.icon.to_string(),
                color: seed.color.to_string(),
                description: seed.description.to_string(),
            })
            .await?;
        category_ids.push(category.id);
        report.categories += 1;
    }

    for seed in &PRODUCTS {
        let image = format!("https://images.unsplash.com/{}{}", seed.photo, IMAGE_PARAMS);
        storage
            .create_product(NewProduct {
                name: seed.name.to_string(),
                description: seed.description.to_string(),
                price: seed.price,
                original_price: Some(seed.original_price),
                image: image.clone(),
                images: vec![image],
                category_id: category_ids.get(seed.category).copied(),
                rating: seed.rating,
                review_count: seed.review_count,
                in_stock: true,
                featured: seed.featured,
                flash_deal: seed.flash_deal,
                discount_percentage: seed.discount_percentage,
                delivery_time: seed.delivery_time.to_string(),
                tags: seed.tags.iter().map(|t| t.to_string()).collect(),
            })
            .await?;
        report.products += 1;
    }

    let accounts = [
        (ADMIN_EMAIL, ADMIN_PASSWORD, "Admin", "User", Role::Admin),
        (DEMO_EMAIL, DEMO_PASSWORD, "Demo", "Customer", Role::Customer),
    ];
    for (email, password, first_name, last_name, role) in accounts {
        if storage.get_user_by_email(email).await?.is_some() {
            continue;
        }
        storage
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: hash_password(password)?,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                role,
            })
            .await?;
        report.users += 1;
    }

    tracing::info!(
        categories = report.categories,
        products = report.products,
        users = report.users,
        "demo data seeded"
    );
    Ok(report)
}
