//! Sample dataset served when no backing data exists.

use chrono::{TimeZone, Utc};

use crate::product::Product;

/// Fixed sample products.
pub fn sample_products() -> Vec<Product> {
    let updated_at = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    vec![
        Product {
            item_id: "sample-1001".to_string(),
            name: "Tai nghe Bluetooth TWS chống ồn".to_string(),
            price: 259000.0,
            original_price: Some(399000.0),
            discount_percent: Some(35),
            sales: 12840,
            rating: Some(4.8),
            image_url: "https://cf.shopee.vn/file/sample-earbuds".to_string(),
            image_urls: vec!["https://cf.shopee.vn/file/sample-earbuds-2".to_string()],
            offer_link: "https://s.shopee.vn/sample1001".to_string(),
            product_link: "https://shopee.vn/product/1/1001".to_string(),
            shop_id: "1".to_string(),
            shop_name: "Audio Official Store".to_string(),
            category_id: Some("100535".to_string()),
            category_name: Some("Thiết bị âm thanh".to_string()),
            updated_at,
        },
        Product {
            item_id: "sample-1002".to_string(),
            name: "Bình giữ nhiệt inox 500ml".to_string(),
            price: 129000.0,
            original_price: Some(189000.0),
            discount_percent: Some(32),
            sales: 5320,
            rating: Some(4.9),
            image_url: "https://cf.shopee.vn/file/sample-bottle".to_string(),
            image_urls: Vec::new(),
            offer_link: "https://s.shopee.vn/sample1002".to_string(),
            product_link: "https://shopee.vn/product/2/1002".to_string(),
            shop_id: "2".to_string(),
            shop_name: "Nhà Cửa Xinh".to_string(),
            category_id: Some("100636".to_string()),
            category_name: Some("Nhà cửa đời sống".to_string()),
            updated_at,
        },
        Product {
            item_id: "sample-1003".to_string(),
            name: "Áo thun cotton unisex form rộng".to_string(),
            price: 89000.0,
            original_price: None,
            discount_percent: None,
            sales: 20110,
            rating: Some(4.7),
            image_url: "https://cf.shopee.vn/file/sample-tshirt".to_string(),
            image_urls: vec![
                "https://cf.shopee.vn/file/sample-tshirt-2".to_string(),
                "https://cf.shopee.vn/file/sample-tshirt-3".to_string(),
            ],
            offer_link: "https://s.shopee.vn/sample1003".to_string(),
            product_link: "https://shopee.vn/product/3/1003".to_string(),
            shop_id: "3".to_string(),
            shop_name: "Basic Wear".to_string(),
            category_id: Some("100017".to_string()),
            category_name: Some("Thời trang".to_string()),
            updated_at,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_ids_unique() {
        let products = sample_products();
        let mut ids: Vec<_> = products.iter().map(|p| p.item_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), products.len());
    }
}
