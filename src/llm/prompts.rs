pub const REGENERATE_ROOM_PROMPT: &str = "基于用户上传的真实房间照片，生成“奶油风”软装改造后的同角度照片。\
要求：保留原房间的户型结构、门窗位置、墙体与天花轮廓、地面走向与主要硬装不变；\
仅替换软装与表面材质的视觉效果（如墙面颜色、窗帘、地毯、沙发、茶几、灯具、装饰画、绿植、抱枕、床品等）。\
风格：奶油风（奶油白/米白/燕麦/浅驼/浅灰褐），低饱和、柔和、圆润线条、轻盈克制、干净整洁，有层次但不过度堆叠。\
光线：白天自然光，暖色温，柔和阴影，真实反射与质感。\
画面：写实摄影风格，真实比例，不夸张广角，不变形；细节清晰，高级但生活化。\
禁止：卡通/插画风、过度磨皮、强HDR、过锐化、夸张豪华欧式、赛博霓虹、结构改动、出现人物/文字/水印/logo。";

pub const EXTRACT_ITEMS_PROMPT: &str = r#"你是软装清单生成器。请根据图片内容，输出一个 JSON 数组（不要输出任何解释，不要 Markdown，不要代码块）。
每个元素必须严格为：
{
  "category": "sofa_cover|rug|coffee_table|side_table|ceiling_light|floor_lamp|curtain|wall_art|pillows_throw|decor_plants",
  "title": string,
  "spec": string,
  "tips": string,
  "search_terms": { "tmall": string, "jd": string, "pdd": string }
}

要求：
1) 必须输出至少 8 个 item，尽量覆盖 10 个 category。
2) search_terms 是“可用于搜索的中文关键词串”，不是链接；尽量包含：风格词（奶油风/法式奶油风等）、核心品类、颜色、材质、尺寸等。
3) 不要编造品牌/型号；不确定就用通用描述。
4) 全部用中文。"#;

const REPAIR_ITEMS_PREAMBLE: &str = "请把下面内容修复为“严格合法的 JSON 数组”，\
并且每个元素都必须包含：category/title/spec/tips/search_terms(tmall/jd/pdd)。只输出 JSON，不要解释。";

/// Repair instruction with the failed reply embedded verbatim.
pub fn repair_items_prompt(raw_reply: &str) -> String {
    format!("{}\n\n原始输出：\n{}", REPAIR_ITEMS_PREAMBLE, raw_reply)
}
