//! Prompt construction.

use promo_models::{DescriptionOptions, Product, Tone};

/// Build the description prompt for one product.
pub fn build_description_prompt(product: &Product, options: &DescriptionOptions) -> String {
    let tone = match options.tone {
        Tone::Friendly => "thân thiện, gần gũi",
        Tone::Professional => "chuyên nghiệp, đáng tin cậy",
        Tone::Excited => "hào hứng, tràn đầy năng lượng",
        Tone::Casual => "thoải mái, tự nhiên",
    };

    let mut prompt = format!(
        "Bạn là chuyên gia viết nội dung tiếp thị liên kết Shopee. \
         Viết một đoạn mô tả quảng bá ngắn gọn cho sản phẩm dưới đây bằng ngôn ngữ '{}', \
         giọng văn {}, tối đa khoảng {} từ.\n\n",
        options.language,
        tone,
        options.length.word_budget()
    );

    prompt.push_str("THÔNG TIN SẢN PHẨM:\n");
    prompt.push_str(&format!("- Tên: {}\n", product.name));
    prompt.push_str(&format!("- Giá: {}\n", product.price_label()));
    if let Some(original) = product.original_price_label() {
        prompt.push_str(&format!("- Giá gốc: {}\n", original));
    }
    if let Some(discount) = product.discount_percent.filter(|d| *d > 0) {
        prompt.push_str(&format!("- Giảm giá: {}%\n", discount));
    }
    if product.sales > 0 {
        prompt.push_str(&format!("- Đã bán: {}\n", product.sales));
    }
    if let Some(rating) = product.rating {
        prompt.push_str(&format!("- Đánh giá: {:.1}/5\n", rating));
    }
    if !product.shop_name.is_empty() {
        prompt.push_str(&format!("- Cửa hàng: {}\n", product.shop_name));
    }
    if let Some(category) = product.category_name.as_deref() {
        prompt.push_str(&format!("- Danh mục: {}\n", category));
    }

    prompt.push_str("\nYÊU CẦU:\n");
    prompt.push_str(if options.include_emoji {
        "- Dùng emoji phù hợp để tăng sức hút\n"
    } else {
        "- Không dùng emoji\n"
    });
    prompt.push_str(if options.include_hashtags {
        "- Kết thúc bằng 3-5 hashtag liên quan\n"
    } else {
        "- Không dùng hashtag\n"
    });
    prompt.push_str("- Không bịa đặt thông số không có trong thông tin sản phẩm\n");
    prompt.push_str("- Chỉ trả về nội dung mô tả, không kèm giải thích\n");

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_models::{sample_products, DescriptionLength};

    #[test]
    fn test_prompt_includes_product_fields() {
        let product = sample_products().remove(0);
        let prompt = build_description_prompt(&product, &DescriptionOptions::default());
        assert!(prompt.contains(&product.name));
        assert!(prompt.contains("Giảm giá: 35%"));
        assert!(prompt.contains("hashtag"));
    }

    #[test]
    fn test_prompt_respects_toggles() {
        let product = sample_products().remove(2);
        let options = DescriptionOptions {
            include_emoji: false,
            include_hashtags: false,
            length: DescriptionLength::Short,
            ..Default::default()
        };
        let prompt = build_description_prompt(&product, &options);
        assert!(prompt.contains("Không dùng emoji"));
        assert!(prompt.contains("Không dùng hashtag"));
        assert!(prompt.contains("40 từ"));
        assert!(!prompt.contains("Giảm giá"));
    }
}
