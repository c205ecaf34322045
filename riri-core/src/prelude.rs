//! Runtime support text prepended to every generated C++ file.
//!
//! The blocks are static; only [`EmitOptions`] decides which of them are
//! included. Every `_riri_*` helper the emitter lowers a call to must be
//! defined in one of these blocks.

use crate::codegen_cpp::EmitOptions;

const STD_HEADERS: &str = r#"#include <iostream>
#include <vector>
#include <string>
#include <functional>
#include <cmath>
#include <algorithm>
#include <cstdlib>
#include <ctime>
#include <stdexcept>
#include <queue>
#include <stack>
#include <map>
#include <unordered_map>
#include <set>
#include <regex>
#include <memory>
#include <sstream>
#include <thread>
#include <chrono>
#include <future>
#include <type_traits>
#include <utility>
"#;

const GUI_HEADERS: &str = r#"#include <QApplication>
#include <QWidget>
#include <QPushButton>
#include <QLabel>
#include <QLineEdit>
#include <QVBoxLayout>
#include <QHBoxLayout>
#include <QListWidget>
#include <QMessageBox>
"#;

const HTTP_HEADERS: &str = r#"#include "httplib.h"
"#;

const ASYNC_HELPERS: &str = r#"
// --- async ---
template <typename Func>
auto async_task(Func&& func) {
    return std::async(std::launch::async, std::forward<Func>(func));
}

void delay(int milliseconds) {
    std::this_thread::sleep_for(std::chrono::milliseconds(milliseconds));
}

template <typename T>
T await_result(std::future<T>& future) {
    return future.get();
}

template <typename T>
T await_result(std::future<T>&& future) {
    return future.get();
}

template <typename T>
decltype(auto) await_result(T&& value) {
    return std::forward<T>(value);
}
"#;

const HTTP_HELPERS: &str = r#"
// --- http request helpers ---
std::string _riri_get_query(const std::multimap<std::string, std::string>& m, const std::string& key) {
    auto it = m.find(key);
    if (it != m.end()) return it->second;
    return "";
}

std::string _riri_get_param(const std::unordered_map<std::string, std::string>& m, const std::string& key) {
    auto it = m.find(key);
    if (it != m.end()) return it->second;
    return "";
}
"#;

const GUI_HELPERS: &str = r#"
// --- gui ---
QString qt_str(const std::string& s) { return QString::fromStdString(s); }
std::string qt_to_std(const QString& s) { return s.toStdString(); }

void qt_connect(std::shared_ptr<QPushButton> btn, std::string signal, std::function<void()> callback) {
    if (signal == "clicked" && btn) {
        QObject::connect(btn.get(), &QPushButton::clicked, callback);
    }
}

std::shared_ptr<QListWidget> _riri_create_list() {
    return std::make_shared<QListWidget>();
}

void _riri_list_add(std::shared_ptr<QListWidget> list, const std::string& item) {
    list->addItem(qt_str(item));
}

void _riri_list_clear(std::shared_ptr<QListWidget> list) {
    list->clear();
}

void _riri_msg_box(const std::string& msg) {
    QMessageBox box;
    box.setText(qt_str(msg));
    box.exec();
}

// Widgets are owned by the Qt parent hierarchy, not by QtElement.
struct QtElement {
    QWidget* widget = nullptr;
    QLayout* layout = nullptr;
    std::string tagName;

    explicit QtElement(std::string tag) : tagName(std::move(tag)) {}

    void setAttribute(const std::string& key, const std::string& value) {
        if (!widget) return;
        if (key == "text") {
            if (auto btn = qobject_cast<QPushButton*>(widget)) btn->setText(qt_str(value));
            else if (auto lbl = qobject_cast<QLabel*>(widget)) lbl->setText(qt_str(value));
            else if (auto inp = qobject_cast<QLineEdit*>(widget)) inp->setText(qt_str(value));
        } else if (key == "title") {
            widget->setWindowTitle(qt_str(value));
        } else if (key == "style") {
            widget->setStyleSheet(qt_str(value));
        } else if (key == "placeholder") {
            if (auto inp = qobject_cast<QLineEdit*>(widget)) inp->setPlaceholderText(qt_str(value));
        }
    }

    std::string getValue() {
        if (auto inp = qobject_cast<QLineEdit*>(widget)) return qt_to_std(inp->text());
        return "";
    }

    void addItem(const std::string& text) {
        if (auto lst = qobject_cast<QListWidget*>(widget)) lst->addItem(qt_str(text));
    }

    void clearItems() {
        if (auto lst = qobject_cast<QListWidget*>(widget)) lst->clear();
    }

    void addEventListener(const std::string& event, std::function<void()> callback) {
        if (event != "click") return;
        if (auto btn = qobject_cast<QPushButton*>(widget)) {
            QObject::connect(btn, &QPushButton::clicked, callback);
        }
    }

    void appendChild(QtElement* child) {
        if (!widget || !child || !child->widget) return;
        if (layout) {
            layout->addWidget(child->widget);
        } else {
            child->widget->setParent(widget);
            child->widget->show();
        }
    }

    void show() {
        if (widget) widget->show();
    }
};

struct Document {
    QtElement* createElement(const std::string& tag) {
        auto* el = new QtElement(tag);
        if (tag == "div" || tag == "window") {
            el->widget = new QWidget();
            el->layout = new QVBoxLayout(el->widget);
            if (tag == "window") el->widget->resize(400, 300);
        } else if (tag == "span") {
            el->widget = new QWidget();
            el->layout = new QHBoxLayout(el->widget);
        } else if (tag == "button") {
            el->widget = new QPushButton();
        } else if (tag == "label") {
            el->widget = new QLabel();
        } else if (tag == "input") {
            el->widget = new QLineEdit();
        } else if (tag == "list") {
            el->widget = new QListWidget();
        }
        return el;
    }
};
"#;

const IO_HELPERS: &str = r#"
// --- io ---
std::string _riri_input() {
    std::string line;
    std::getline(std::cin, line);
    return line;
}

template <typename T>
void _riri_tprint(const std::vector<T>& vec) {
    std::cout << "+----------------+" << std::endl;
    std::cout << "| Index | Value  |" << std::endl;
    std::cout << "+----------------+" << std::endl;
    for (size_t i = 0; i < vec.size(); ++i) {
        std::cout << "| " << i << "\t| " << vec[i] << "\t|" << std::endl;
    }
    std::cout << "+----------------+" << std::endl;
}
"#;

const PUSH_POP_HELPERS: &str = r#"
// --- push / pop over vectors and user types ---
template <typename T, typename U>
void _riri_push(std::vector<T>& vec, U&& value) {
    vec.push_back(std::forward<U>(value));
}

template <typename T, typename U>
void _riri_push(T* obj, U&& value) {
    obj->push(std::forward<U>(value));
}

template <typename T, typename U>
void _riri_push(std::shared_ptr<T> obj, U&& value) {
    obj->push(std::forward<U>(value));
}

template <typename T>
T _riri_pop(std::vector<T>& vec) {
    if (vec.empty()) return T();
    T value = vec.back();
    vec.pop_back();
    return value;
}

template <typename T>
auto _riri_pop(T* obj) {
    return obj->pop();
}

template <typename T>
auto _riri_pop(std::shared_ptr<T> obj) {
    return obj->pop();
}
"#;

const ARRAY_HELPERS: &str = r#"
// --- array helpers ---
template <typename T, typename Func>
auto _riri_map(const std::vector<T>& vec, Func callback) {
    std::vector<std::decay_t<std::invoke_result_t<Func&, const T&>>> result;
    result.reserve(vec.size());
    for (const auto& item : vec) result.push_back(callback(item));
    return result;
}

template <typename T, typename Func>
std::vector<T> _riri_filter(const std::vector<T>& vec, Func callback) {
    std::vector<T> result;
    for (const auto& item : vec) {
        if (callback(item)) result.push_back(item);
    }
    return result;
}

template <typename T, typename Func>
void _riri_forEach(const std::vector<T>& vec, Func callback) {
    for (size_t i = 0; i < vec.size(); i++) {
        if constexpr (std::is_invocable_v<Func&, const T&, int>) {
            callback(vec[i], static_cast<int>(i));
        } else {
            callback(vec[i]);
        }
    }
}

template <typename T, typename Func, typename Acc>
Acc _riri_reduce(const std::vector<T>& vec, Func callback, Acc initial) {
    Acc result = initial;
    for (size_t i = 0; i < vec.size(); i++) {
        if constexpr (std::is_invocable_v<Func&, Acc&, const T&, int>) {
            result = callback(result, vec[i], static_cast<int>(i));
        } else {
            result = callback(result, vec[i]);
        }
    }
    return result;
}

template <typename T>
std::vector<T> _riri_slice(const std::vector<T>& vec, int start, int end = -1) {
    int size = static_cast<int>(vec.size());
    if (end == -1) end = size;
    if (start < 0) start = size + start;
    if (end < 0) end = size + end;
    if (start < 0) start = 0;
    if (end > size) end = size;
    if (start >= end) return std::vector<T>();
    return std::vector<T>(vec.begin() + start, vec.begin() + end);
}

template <typename T, typename U>
int _riri_indexOf(const std::vector<T>& vec, const U& value) {
    for (size_t i = 0; i < vec.size(); i++) {
        if (vec[i] == value) return static_cast<int>(i);
    }
    return -1;
}

template <typename T, typename U>
bool _riri_includes(const std::vector<T>& vec, const U& value) {
    return _riri_indexOf(vec, value) != -1;
}

template <typename T>
std::vector<T> _riri_concat(const std::vector<T>& a, const std::vector<T>& b) {
    std::vector<T> result = a;
    result.insert(result.end(), b.begin(), b.end());
    return result;
}

template <typename T>
std::vector<T> _riri_reverse(std::vector<T> vec) {
    std::reverse(vec.begin(), vec.end());
    return vec;
}

template <typename T>
std::string _riri_join(const std::vector<T>& vec, const std::string& separator = ",") {
    std::ostringstream out;
    for (size_t i = 0; i < vec.size(); i++) {
        if (i > 0) out << separator;
        out << vec[i];
    }
    return out.str();
}
"#;

const STRING_HELPERS: &str = r#"
// --- string helpers ---
std::vector<std::string> _riri_split(std::string str, const std::string& delimiter) {
    std::vector<std::string> result;
    if (delimiter.empty()) {
        result.push_back(str);
        return result;
    }
    size_t pos = 0;
    while ((pos = str.find(delimiter)) != std::string::npos) {
        result.push_back(str.substr(0, pos));
        str.erase(0, pos + delimiter.length());
    }
    result.push_back(str);
    return result;
}

std::string _riri_toLowerCase(std::string str) {
    std::transform(str.begin(), str.end(), str.begin(), [](unsigned char c) { return std::tolower(c); });
    return str;
}

std::string _riri_toUpperCase(std::string str) {
    std::transform(str.begin(), str.end(), str.begin(), [](unsigned char c) { return std::toupper(c); });
    return str;
}

std::string _riri_trim(std::string str) {
    const char* blank = " \t\n\r";
    auto first = str.find_first_not_of(blank);
    if (first == std::string::npos) return "";
    auto last = str.find_last_not_of(blank);
    return str.substr(first, last - first + 1);
}

bool _riri_startsWith(const std::string& str, const std::string& prefix) {
    return str.rfind(prefix, 0) == 0;
}

int _riri_parseInt(const std::string& str) {
    return std::stoi(str);
}

double _riri_parseFloat(const std::string& str) {
    return std::stod(str);
}
"#;

const DATA_STRUCTURES: &str = r#"
// --- data structures ---
struct Node {
    int data;
    std::shared_ptr<Node> left = nullptr;
    std::shared_ptr<Node> right = nullptr;
    int height = 1;

    explicit Node(int value) : data(value) {}
};

struct BinaryTree {
    std::shared_ptr<Node> root = nullptr;

    void insert(int value) {
        if (!root) {
            root = std::make_shared<Node>(value);
            return;
        }
        insertRec(root, value);
    }

    void insertRec(std::shared_ptr<Node> node, int value) {
        auto& next = value < node->data ? node->left : node->right;
        if (next) insertRec(next, value);
        else next = std::make_shared<Node>(value);
    }

    void printInOrder() {
        printInOrderRec(root);
        std::cout << std::endl;
    }

    void printInOrderRec(std::shared_ptr<Node> node) {
        if (!node) return;
        printInOrderRec(node->left);
        std::cout << node->data << " ";
        printInOrderRec(node->right);
    }
};

struct BST : public BinaryTree {
    bool search(int value) {
        auto node = root;
        while (node) {
            if (node->data == value) return true;
            node = value < node->data ? node->left : node->right;
        }
        return false;
    }
};

struct AVL {
    std::shared_ptr<Node> root = nullptr;

    static int height(const std::shared_ptr<Node>& n) { return n ? n->height : 0; }

    static void update(const std::shared_ptr<Node>& n) {
        n->height = 1 + std::max(height(n->left), height(n->right));
    }

    static int balance(const std::shared_ptr<Node>& n) {
        return n ? height(n->left) - height(n->right) : 0;
    }

    static std::shared_ptr<Node> rightRotate(std::shared_ptr<Node> y) {
        auto x = y->left;
        y->left = x->right;
        x->right = y;
        update(y);
        update(x);
        return x;
    }

    static std::shared_ptr<Node> leftRotate(std::shared_ptr<Node> x) {
        auto y = x->right;
        x->right = y->left;
        y->left = x;
        update(x);
        update(y);
        return y;
    }

    std::shared_ptr<Node> insertRec(std::shared_ptr<Node> node, int value) {
        if (!node) return std::make_shared<Node>(value);
        if (value < node->data) node->left = insertRec(node->left, value);
        else if (value > node->data) node->right = insertRec(node->right, value);
        else return node;

        update(node);
        int b = balance(node);
        if (b > 1 && value < node->left->data) return rightRotate(node);
        if (b < -1 && value > node->right->data) return leftRotate(node);
        if (b > 1 && value > node->left->data) {
            node->left = leftRotate(node->left);
            return rightRotate(node);
        }
        if (b < -1 && value < node->right->data) {
            node->right = rightRotate(node->right);
            return leftRotate(node);
        }
        return node;
    }

    void insert(int value) { root = insertRec(root, value); }

    void printInOrder() {
        printInOrderRec(root);
        std::cout << std::endl;
    }

    void printInOrderRec(std::shared_ptr<Node> node) {
        if (!node) return;
        printInOrderRec(node->left);
        std::cout << node->data << " ";
        printInOrderRec(node->right);
    }
};

// Max-heap over a flat array.
struct Heap {
    std::vector<int> data;

    void push(int value) {
        data.push_back(value);
        std::push_heap(data.begin(), data.end());
    }

    int pop() {
        if (data.empty()) return -1;
        std::pop_heap(data.begin(), data.end());
        int value = data.back();
        data.pop_back();
        return value;
    }

    int top() { return data.empty() ? -1 : data.front(); }

    void print() {
        for (int value : data) std::cout << value << " ";
        std::cout << std::endl;
    }
};

struct Graph {
    std::map<int, std::vector<std::pair<int, int>>> adj;
    std::map<int, std::pair<int, int>> coords;

    void add_edge(int u, int v, int w) { adj[u].push_back({v, w}); }

    void set_pos(int u, int x, int y) { coords[u] = {x, y}; }

    std::vector<int> bfs(int start) {
        std::vector<int> order;
        std::queue<int> pending;
        std::set<int> seen{start};
        pending.push(start);
        while (!pending.empty()) {
            int u = pending.front();
            pending.pop();
            order.push_back(u);
            for (auto& [v, w] : adj[u]) {
                if (seen.insert(v).second) pending.push(v);
            }
        }
        return order;
    }

    std::vector<int> dfs(int start) {
        std::vector<int> order;
        std::stack<int> pending;
        std::set<int> seen;
        pending.push(start);
        while (!pending.empty()) {
            int u = pending.top();
            pending.pop();
            if (!seen.insert(u).second) continue;
            order.push_back(u);
            auto& neighbors = adj[u];
            for (auto it = neighbors.rbegin(); it != neighbors.rend(); ++it) {
                if (!seen.count(it->first)) pending.push(it->first);
            }
        }
        return order;
    }

    std::vector<int> dijkstra(int start, int end) {
        using Entry = std::pair<int, int>;
        std::priority_queue<Entry, std::vector<Entry>, std::greater<Entry>> pq;
        std::map<int, int> dist;
        std::map<int, int> parent;
        dist[start] = 0;
        pq.push({0, start});
        while (!pq.empty()) {
            auto [d, u] = pq.top();
            pq.pop();
            if (d > dist[u]) continue;
            if (u == end) break;
            for (auto& [v, w] : adj[u]) {
                if (!dist.count(v) || dist[u] + w < dist[v]) {
                    dist[v] = dist[u] + w;
                    parent[v] = u;
                    pq.push({dist[v], v});
                }
            }
        }
        return walkBack(start, end, dist.count(end) > 0, parent);
    }

    double heuristic(int u, int v) {
        if (!coords.count(u) || !coords.count(v)) return 0;
        double dx = coords[u].first - coords[v].first;
        double dy = coords[u].second - coords[v].second;
        return std::sqrt(dx * dx + dy * dy);
    }

    std::vector<int> astar(int start, int end) {
        using Entry = std::pair<double, int>;
        std::priority_queue<Entry, std::vector<Entry>, std::greater<Entry>> pq;
        std::map<int, int> g;
        std::map<int, int> parent;
        g[start] = 0;
        pq.push({heuristic(start, end), start});
        while (!pq.empty()) {
            int u = pq.top().second;
            pq.pop();
            if (u == end) break;
            for (auto& [v, w] : adj[u]) {
                int tentative = g[u] + w;
                if (!g.count(v) || tentative < g[v]) {
                    g[v] = tentative;
                    parent[v] = u;
                    pq.push({tentative + heuristic(v, end), v});
                }
            }
        }
        return walkBack(start, end, g.count(end) > 0, parent);
    }

    static std::vector<int> walkBack(int start, int end, bool reached, std::map<int, int>& parent) {
        std::vector<int> path;
        if (!reached) return path;
        for (int at = end; at != start; at = parent[at]) path.push_back(at);
        path.push_back(start);
        std::reverse(path.begin(), path.end());
        return path;
    }
};

struct Regex {
    std::regex re;
    std::string pattern;

    explicit Regex(std::string p) : pattern(std::move(p)) {
        try {
            re = std::regex(pattern);
        } catch (const std::regex_error& e) {
            std::cerr << "Regex error: " << e.what() << std::endl;
        }
    }

    bool match(const std::string& s) { return std::regex_search(s, re); }

    std::string replace(const std::string& s, const std::string& replacement) {
        return std::regex_replace(s, re, replacement);
    }
};
"#;

/// Assemble the prelude for the given feature set.
pub fn prelude(options: &EmitOptions) -> String {
    let mut blocks = vec![STD_HEADERS];
    if options.gui_toolkit {
        blocks.push(GUI_HEADERS);
    }
    if options.http_server {
        blocks.push(HTTP_HEADERS);
    }
    blocks.push(ASYNC_HELPERS);
    if options.http_server {
        blocks.push(HTTP_HELPERS);
    }
    if options.gui_toolkit {
        blocks.push(GUI_HELPERS);
    }
    blocks.extend([
        IO_HELPERS,
        PUSH_POP_HELPERS,
        ARRAY_HELPERS,
        STRING_HELPERS,
        DATA_STRUCTURES,
    ]);
    blocks.concat()
}

/// True if the prelude for `options` defines a helper called `name`.
pub fn defines(options: &EmitOptions, name: &str) -> bool {
    let text = prelude(options);
    text.match_indices(name).any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after = text[at + name.len()..].chars().next();
        matches!(before, Some(' ') | Some('*'))
            && matches!(after, Some('('))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prelude_has_no_optional_blocks() {
        let text = prelude(&EmitOptions::default());
        assert!(text.starts_with("#include <iostream>"));
        assert!(!text.contains("httplib.h"));
        assert!(!text.contains("QApplication"));
        assert!(!text.contains("_riri_get_query"));
        assert!(text.contains("struct Graph"));
        assert!(text.contains("struct Regex"));
    }

    #[test]
    fn flags_select_blocks() {
        let text = prelude(&EmitOptions {
            gui_toolkit: true,
            http_server: true,
        });
        assert!(text.contains("#include <QApplication>"));
        assert!(text.contains("#include \"httplib.h\""));
        assert!(text.contains("struct Document"));
        assert!(text.contains("_riri_get_param"));
        // Headers precede every helper.
        let last_include = text.rfind("#include").expect("includes");
        let first_helper = text.find("// ---").expect("helpers");
        assert!(last_include < first_helper);
    }

    #[test]
    fn finds_helper_definitions() {
        let options = EmitOptions::default();
        assert!(defines(&options, "_riri_push"));
        assert!(defines(&options, "_riri_tprint"));
        assert!(defines(&options, "await_result"));
        assert!(!defines(&options, "_riri_msg_box"));
        assert!(!defines(&options, "_riri_missing"));
    }

    #[test]
    fn is_stable_across_calls() {
        let options = EmitOptions::default();
        assert_eq!(prelude(&options), prelude(&options));
    }
}
