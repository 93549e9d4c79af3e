use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Entities extracted from a question, grouped into four fixed categories.
///
/// Every category is always present; lists are de-duplicated in insertion
/// order and possibly empty. Bundles are built fresh per question and
/// never merged across questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBundle {
    pub laws: Vec<String>,
    pub crimes: Vec<String>,
    pub organizations: Vec<String>,
    pub concepts: Vec<String>,
}

impl EntityBundle {
    pub fn total(&self) -> usize {
        self.laws.len() + self.crimes.len() + self.organizations.len() + self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Book-title brackets are the strongest signal for a law name.
static BOOK_TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"《([^》]+)》").unwrap());

/// Last-resort pattern for a law-like name: a short run of non-punctuation
/// characters ending in a statute suffix.
static GENERIC_LAW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^，。！？、\s]{1,8}(?:法|条例|规定|办法|规则|细则)").unwrap());

/// Verbs that introduce a law rather than being part of its name, so
/// "讲讲合同法" is not captured as "讲合同法".
const NARRATION_VERBS: &[char] = &['讲', '说', '介', '解'];

/// Curated law names, matched longest-first so "劳动合同法" beats "合同法".
static LAW_NAMES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut names = vec![
        "中华人民共和国民法典",
        "中华人民共和国刑法",
        "消费者权益保护法",
        "反不正当竞争法",
        "未成年人保护法",
        "个人信息保护法",
        "道路交通安全法",
        "治安管理处罚法",
        "劳动合同法",
        "产品质量法",
        "民事诉讼法",
        "刑事诉讼法",
        "行政诉讼法",
        "行政处罚法",
        "侵权责任法",
        "著作权法",
        "民法典",
        "婚姻法",
        "继承法",
        "劳动法",
        "合同法",
        "公司法",
        "物权法",
        "担保法",
        "保险法",
        "商标法",
        "专利法",
        "刑法",
        "宪法",
    ];
    names.sort_by_key(|name| std::cmp::Reverse(name.chars().count()));
    names
});

const CRIME_KEYWORDS: &[&str] = &[
    "故意伤害罪",
    "故意杀人罪",
    "交通肇事罪",
    "危险驾驶罪",
    "非法拘禁罪",
    "职务侵占罪",
    "挪用资金罪",
    "敲诈勒索罪",
    "寻衅滋事罪",
    "聚众斗殴罪",
    "盗窃罪",
    "诈骗罪",
    "抢劫罪",
    "抢夺罪",
    "绑架罪",
    "强奸罪",
    "贪污罪",
    "受贿罪",
    "行贿罪",
];

const ORGANIZATION_KEYWORDS: &[&str] = &[
    "最高人民法院",
    "劳动仲裁委员会",
    "市场监督管理局",
    "人民法院",
    "人民检察院",
    "仲裁委员会",
    "律师事务所",
    "公安机关",
    "劳动监察",
    "公安局",
    "派出所",
    "司法局",
    "公证处",
];

const CONCEPT_KEYWORDS: &[&str] = &[
    "诉讼时效",
    "举证责任",
    "正当防卫",
    "紧急避险",
    "无因管理",
    "不当得利",
    "取保候审",
    "竞业限制",
    "抚养权",
    "违约金",
    "加班费",
    "合同",
    "违约",
    "侵权",
    "代理",
    "抵押",
    "质押",
    "担保",
    "保证",
    "定金",
    "管辖",
    "证据",
    "婚姻",
    "离婚",
    "赡养",
    "继承",
    "遗嘱",
    "缓刑",
    "假释",
    "工伤",
];

/// Extracts the four-category entity bundle from a question.
///
/// Pure and stateless; running it twice on the same text yields an
/// identical, order-stable bundle.
pub fn extract_entities(question: &str) -> EntityBundle {
    let mut bundle = EntityBundle::default();

    extract_laws(question, &mut bundle.laws);

    for crime in CRIME_KEYWORDS {
        if question.contains(crime) {
            push_unique(&mut bundle.crimes, crime);
        }
    }

    for org in ORGANIZATION_KEYWORDS {
        if question.contains(org) {
            push_unique(&mut bundle.organizations, org);
        }
    }

    for concept in CONCEPT_KEYWORDS {
        if question.contains(concept) && !shadowed_by_law(concept, &bundle.laws) {
            push_unique(&mut bundle.concepts, concept);
        }
    }

    bundle
}

/// Law names are extracted in three tiers: book-title brackets, then the
/// curated table (longest name first, first hit wins), then the generic
/// suffix pattern.
fn extract_laws(question: &str, laws: &mut Vec<String>) {
    for capture in BOOK_TITLE_RE.captures_iter(question) {
        push_unique(laws, &capture[1]);
    }

    if laws.is_empty() {
        for name in LAW_NAMES.iter() {
            if question.contains(name) {
                push_unique(laws, name);
                break;
            }
        }
    }

    if laws.is_empty() {
        for matched in GENERIC_LAW_RE.find_iter(question) {
            let candidate = matched.as_str();
            let starts_with_narration = candidate
                .chars()
                .next()
                .is_some_and(|c| NARRATION_VERBS.contains(&c));
            if !starts_with_narration {
                push_unique(laws, candidate);
            }
        }
    }
}

/// A concept keyword already covered by a recognized law name (in either
/// containment direction) is dropped, so "合同" is not a concept when
/// "合同法" was recognized as a law.
fn shadowed_by_law(concept: &str, laws: &[String]) -> bool {
    laws.iter()
        .any(|law| law.contains(concept) || concept.contains(law.as_str()))
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}
